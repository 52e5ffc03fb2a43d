//! # Hooks
//!
//! Function components keep state in an ordered slot store owned by their
//! mounted node. Each hook call takes the slot under the store's cursor and
//! advances it; the cursor is reset before every render, so the Nth hook call
//! always refers to the Nth slot. Hook order must therefore be the same on
//! every render: no hooks inside conditions or loops.
//!
//! ```rust
//! use sprig_core::*;
//!
//! fn counter(_props: &Props) -> Option<Element> {
//!     let (count, set_count) = use_state(0);
//!     let inc = on(move |_| set_count.update(|c| c + 1));
//!     Some(element!("button", { "id" => "inc", "onClick" => inc }, count))
//! }
//!
//! let rt = Runtime::new();
//! let root = rt.create_container("div");
//! rt.render(element!(function(counter)), root).unwrap();
//!
//! let button = rt.document().get_element_by_id(root, "inc").unwrap();
//! rt.dispatch_event(NativeEvent::click(button));
//! assert_eq!(rt.document().text_content(root), "1");
//! ```
//!
//! Effects are scheduled, not run during render: `use_layout_effect` bodies
//! run on the microtask checkpoint that closes the current runtime entry,
//! `use_effect` bodies run as tasks (drive them with
//! [`Runtime::run_until_idle`](crate::Runtime::run_until_idle)).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::effects::Dispose;
use crate::element::{Ref, RefProp, RefTarget, create_ref};
use crate::reconcile::VNodeId;
use crate::runtime::Inner;
use crate::scheduler::Job;

thread_local! {
    static CURRENT: RefCell<Option<HookFrame>> = const { RefCell::new(None) };
}

type Cleanup = Rc<RefCell<Option<Dispose>>>;

/// Ordered hook slots of one mounted function component.
pub struct HookStore {
    slots: Vec<Box<dyn Any>>,
    cursor: usize,
    cleanups: Vec<Cleanup>,
    alive: Rc<Cell<bool>>,
}

impl Default for HookStore {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            cleanups: Vec::new(),
            alive: Rc::new(Cell::new(true)),
        }
    }
}

impl HookStore {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Marks the store dead and hands back pending cleanups. Scheduled
    /// effects that have not run yet are skipped from now on.
    pub(crate) fn dispose(&mut self) -> Vec<Dispose> {
        self.alive.set(false);
        self.cleanups
            .drain(..)
            .filter_map(|c| c.borrow_mut().take())
            .collect()
    }
}

#[derive(Clone)]
pub(crate) struct HookFrame {
    store: Rc<RefCell<HookStore>>,
    rt: Weak<Inner>,
    vnode: Option<VNodeId>,
}

impl HookFrame {
    pub(crate) fn new(store: Rc<RefCell<HookStore>>, rt: Weak<Inner>, vnode: VNodeId) -> Self {
        Self {
            store,
            rt,
            vnode: Some(vnode),
        }
    }

    fn detached() -> Self {
        Self {
            store: Rc::default(),
            rt: Weak::new(),
            vnode: None,
        }
    }

    /// Runs `f` with this frame current, restoring the previous one after.
    pub(crate) fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        self.store.borrow_mut().reset();
        let prev = CURRENT.with(|current| current.borrow().clone());
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
        let result = f();
        CURRENT.with(|current| *current.borrow_mut() = prev);

        let store = self.store.borrow();
        if store.cursor() != store.len() {
            log::warn!(
                "component called {} hooks but its store holds {}; hook order must not change between renders",
                store.cursor(),
                store.len()
            );
        }
        result
    }

    /// Slot under the cursor, created with `init` on first use. The flag is
    /// true when the slot was just created.
    fn slot<T: 'static>(&self, init: impl FnOnce() -> T) -> (Rc<T>, bool) {
        let mut store = self.store.borrow_mut();
        let cursor = store.cursor;
        store.cursor += 1;

        if cursor >= store.slots.len() {
            let rc: Rc<T> = Rc::new(init());
            store.slots.push(Box::new(rc.clone()));
            return (rc, true);
        }

        if let Some(rc) = store.slots[cursor].downcast_ref::<Rc<T>>() {
            (rc.clone(), false)
        } else {
            log::warn!("hook slot {cursor} changed type; replacing it");
            let rc: Rc<T> = Rc::new(init());
            store.slots[cursor] = Box::new(rc.clone());
            (rc, true)
        }
    }

    fn alive(&self) -> Rc<Cell<bool>> {
        self.store.borrow().alive.clone()
    }

    fn register_cleanup(&self, cleanup: Cleanup) {
        self.store.borrow_mut().cleanups.push(cleanup);
    }

    fn schedule(&self, layout: bool, job: Job) {
        let Some(rt) = self.rt.upgrade() else {
            log::debug!("dropping effect scheduled outside a runtime");
            return;
        };
        let mut scheduler = rt.scheduler.borrow_mut();
        if layout {
            scheduler.queue_microtask(job);
        } else {
            scheduler.queue_task(job);
        }
    }
}

fn current_frame() -> HookFrame {
    CURRENT
        .with(|current| current.borrow().clone())
        .unwrap_or_else(|| {
            log::error!("hooks can only be called while a function component renders");
            HookFrame::detached()
        })
}

/// Replaces a `use_state` slot and schedules a re-render of its component.
pub struct StateSetter<T> {
    cell: Weak<RefCell<T>>,
    rt: Weak<Inner>,
    vnode: Option<VNodeId>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            rt: self.rt.clone(),
            vnode: self.vnode,
        }
    }
}

impl<T: 'static> StateSetter<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value)
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let Some(cell) = self.cell.upgrade() else {
            log::debug!("state setter called after its component unmounted");
            return;
        };
        let next = f(&cell.borrow());
        *cell.borrow_mut() = next;
        if let (Some(rt), Some(vnode)) = (self.rt.upgrade(), self.vnode) {
            rt.schedule(crate::batch::UpdateTarget::Function(vnode));
        }
    }
}

pub fn use_state<T: Clone + 'static>(initial: T) -> (T, StateSetter<T>) {
    let frame = current_frame();
    let (cell, _) = frame.slot(|| RefCell::new(initial));
    let value = cell.borrow().clone();
    let setter = StateSetter {
        cell: Rc::downgrade(&cell),
        rt: frame.rt.clone(),
        vnode: frame.vnode,
    };
    (value, setter)
}

pub struct Dispatch<A>(Rc<dyn Fn(A)>);

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        (self.0)(action)
    }
}

pub fn use_reducer<S, A>(reducer: impl Fn(&S, A) -> S + 'static, initial: S) -> (S, Dispatch<A>)
where
    S: Clone + 'static,
    A: 'static,
{
    let (state, set_state) = use_state(initial);
    let reducer = Rc::new(reducer);
    let dispatch = Dispatch(Rc::new(move |action: A| {
        let reducer = reducer.clone();
        set_state.update(move |current| reducer(current, action));
    }));
    (state, dispatch)
}

struct EffectSlot<D> {
    deps: RefCell<Option<D>>,
    cleanup: Cleanup,
}

fn effect_hook<D, F, R>(layout: bool, deps: D, effect: F)
where
    D: PartialEq + 'static,
    F: FnOnce() -> R + 'static,
    R: Into<Dispose>,
{
    let frame = current_frame();
    let (slot, created) = frame.slot(|| EffectSlot::<D> {
        deps: RefCell::new(None),
        cleanup: Rc::default(),
    });
    if created {
        frame.register_cleanup(slot.cleanup.clone());
    }

    if slot.deps.borrow().as_ref() == Some(&deps) {
        return;
    }
    *slot.deps.borrow_mut() = Some(deps);

    let cleanup = slot.cleanup.clone();
    let alive = frame.alive();
    frame.schedule(
        layout,
        Box::new(move || {
            if !alive.get() {
                return;
            }
            let previous = cleanup.borrow_mut().take();
            if let Some(d) = previous {
                d.run();
            }
            let next = effect().into();
            *cleanup.borrow_mut() = Some(next);
        }),
    );
}

/// Runs `effect` as a task after the render pass whenever `deps` changed
/// (and after the first render). The previous cleanup runs first.
pub fn use_effect<D, F, R>(deps: D, effect: F)
where
    D: PartialEq + 'static,
    F: FnOnce() -> R + 'static,
    R: Into<Dispose>,
{
    effect_hook(false, deps, effect)
}

/// Like [`use_effect`] but runs on the microtask checkpoint, before any
/// deferred effect.
pub fn use_layout_effect<D, F, R>(deps: D, effect: F)
where
    D: PartialEq + 'static,
    F: FnOnce() -> R + 'static,
    R: Into<Dispose>,
{
    effect_hook(true, deps, effect)
}

/// A container that stays the same across renders.
pub fn use_ref(initial: Option<RefTarget>) -> Ref {
    let frame = current_frame();
    let (r, _) = frame.slot(|| {
        let r = create_ref();
        r.set_current(initial);
        r
    });
    (*r).clone()
}

/// Publishes `init()` through a forwarded ref. Runs in the layout-effect
/// slot, so it replaces whatever host node the ref was given at mount.
pub fn use_imperative_handle<D, T, F>(target: Option<&RefProp>, deps: D, init: F)
where
    D: PartialEq + 'static,
    T: Any,
    F: FnOnce() -> T + 'static,
{
    let target = target.cloned();
    use_layout_effect(deps, move || {
        let Some(target) = target else {
            return Dispose::none();
        };
        let handle: Rc<dyn Any> = Rc::new(init());
        target.attach(RefTarget::Handle(handle.clone()));
        Dispose::new(move || target.detach(&RefTarget::Handle(handle)))
    });
}

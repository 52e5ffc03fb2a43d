//! # Class components
//!
//! A class component is any `'static` type implementing [`Component`]. The
//! runtime constructs one instance per mounted element, keeps its props and
//! state in the instance arena, and hands lifecycle methods a [`This`]
//! snapshot (props, state and a [`ComponentHandle`] for scheduling updates).
//! Lifecycle methods take `&self`; keep per-instance mutable data behind
//! `Cell`/`RefCell` if you need it.
//!
//! ```rust
//! use sprig_core::*;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn create(_props: &Props) -> Self {
//!         Counter
//!     }
//!
//!     fn initial_state(_props: &Props) -> State {
//!         record! { "count" => 0 }
//!     }
//!
//!     fn render(&self, this: &This) -> Option<Element> {
//!         let count = this.state().get_int("count").unwrap_or(0);
//!         Some(element!("span", {}, count))
//!     }
//! }
//!
//! let rt = Runtime::new();
//! let root = rt.create_container("div");
//! rt.render(element!(class::<Counter>()), root).unwrap();
//! assert_eq!(rt.document().text_content(root), "0");
//! ```
//!
//! ## Update flow
//!
//! `set_state` queues a [`StatePatch`] (and optional callback) on the
//! instance's [`Updater`](crate::Updater). Inside a batched region the
//! instance is registered once with the batch coordinator; otherwise it is
//! flushed right away. A flush folds every queued patch left to right, merges
//! `get_derived_state_from_props`, consults `should_component_update`,
//! commits, and (when allowed) re-renders and patches the host tree. The
//! queued callbacks always run, after `component_did_update`.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::new_key_type;
use web_time::Duration;

use crate::batch::{Callback, UpdateTarget, Updater};
use crate::element::{Element, Props, short_name};
use crate::error::Result;
use crate::reconcile::VNodeId;
use crate::runtime::{Inner, PostPass};
use crate::scheduler::TimerId;
use crate::value::{Record, Value, shallow_equal};

new_key_type! {
    pub struct InstanceId;
}

/// Class-component state: a shallow-mergeable record.
pub type State = Record;

/// One queued `set_state` argument.
pub enum StatePatch {
    /// Shallow-merged into the accumulated state.
    Merge(Record),
    /// Receives the state accumulated so far (not the committed state) and
    /// returns a partial record to merge.
    Update(Box<dyn FnOnce(&State) -> Record>),
}

impl StatePatch {
    pub fn update(f: impl FnOnce(&State) -> Record + 'static) -> Self {
        StatePatch::Update(Box::new(f))
    }

    pub(crate) fn apply_to(self, acc: &mut State) {
        match self {
            StatePatch::Merge(partial) => acc.merge(partial),
            StatePatch::Update(f) => {
                let partial = f(acc);
                acc.merge(partial);
            }
        }
    }
}

impl From<Record> for StatePatch {
    fn from(r: Record) -> Self {
        StatePatch::Merge(r)
    }
}

impl fmt::Debug for StatePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatePatch::Merge(r) => f.debug_tuple("Merge").field(r).finish(),
            StatePatch::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// Stateful component capability. Every lifecycle method has a no-op default
/// except `create` and `render`.
pub trait Component: Any {
    fn create(props: &Props) -> Self
    where
        Self: Sized;

    fn initial_state(_props: &Props) -> State
    where
        Self: Sized,
    {
        State::new()
    }

    /// Called with the incoming props and the state before this flush's
    /// patches; the result is merged into the next state. Also runs at mount.
    fn get_derived_state_from_props(_next_props: &Props, _prev_state: &State) -> Option<State>
    where
        Self: Sized,
    {
        None
    }

    fn render(&self, this: &This) -> Option<Element>;

    fn component_will_mount(&self, _this: &This) {}

    fn component_did_mount(&self, _this: &This) {}

    /// `this` still holds the previous props and state.
    fn should_component_update(&self, _this: &This, _next_props: &Props, _next_state: &State) -> bool {
        true
    }

    /// Runs after render and before the host tree is patched. The value is
    /// passed to `component_did_update`.
    fn get_snapshot_before_update(
        &self,
        _this: &This,
        _prev_props: &Props,
        _prev_state: &State,
    ) -> Option<Value> {
        None
    }

    fn component_did_update(
        &self,
        _this: &This,
        _prev_props: &Props,
        _prev_state: &State,
        _snapshot: Option<Value>,
    ) {
    }

    fn component_will_unmount(&self, _this: &This) {}
}

/// Type-erased class reference stored in an element.
#[derive(Clone, Copy)]
pub struct ClassType {
    id: TypeId,
    name: &'static str,
    construct: fn(&Props) -> Rc<dyn Component>,
    initial_state: fn(&Props) -> State,
    derive_state: fn(&Props, &State) -> Option<State>,
}

impl ClassType {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        short_name(self.name)
    }

    pub(crate) fn construct(&self, props: &Props) -> Rc<dyn Component> {
        (self.construct)(props)
    }

    pub(crate) fn initial_state(&self, props: &Props) -> State {
        (self.initial_state)(props)
    }

    pub(crate) fn derive_state(&self, next_props: &Props, prev_state: &State) -> Option<State> {
        (self.derive_state)(next_props, prev_state)
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name())
    }
}

fn construct<C: Component>(props: &Props) -> Rc<dyn Component> {
    Rc::new(C::create(props))
}

pub fn class<C: Component>() -> ClassType {
    ClassType {
        id: TypeId::of::<C>(),
        name: type_name::<C>(),
        construct: construct::<C>,
        initial_state: C::initial_state,
        derive_state: C::get_derived_state_from_props,
    }
}

/// Wraps a component so it only re-renders when props or state change by
/// shallow comparison.
pub struct Pure<C>(pub C);

impl<C: Component> Component for Pure<C> {
    fn create(props: &Props) -> Self {
        Pure(C::create(props))
    }

    fn initial_state(props: &Props) -> State {
        C::initial_state(props)
    }

    fn get_derived_state_from_props(next_props: &Props, prev_state: &State) -> Option<State> {
        C::get_derived_state_from_props(next_props, prev_state)
    }

    fn render(&self, this: &This) -> Option<Element> {
        self.0.render(this)
    }

    fn component_will_mount(&self, this: &This) {
        self.0.component_will_mount(this)
    }

    fn component_did_mount(&self, this: &This) {
        self.0.component_did_mount(this)
    }

    fn should_component_update(&self, this: &This, next_props: &Props, next_state: &State) -> bool {
        !this.props().shallow_eq(next_props) || !shallow_equal(this.state(), next_state)
    }

    fn get_snapshot_before_update(
        &self,
        this: &This,
        prev_props: &Props,
        prev_state: &State,
    ) -> Option<Value> {
        self.0.get_snapshot_before_update(this, prev_props, prev_state)
    }

    fn component_did_update(
        &self,
        this: &This,
        prev_props: &Props,
        prev_state: &State,
        snapshot: Option<Value>,
    ) {
        self.0
            .component_did_update(this, prev_props, prev_state, snapshot)
    }

    fn component_will_unmount(&self, this: &This) {
        self.0.component_will_unmount(this)
    }
}

/// What a lifecycle method sees: a snapshot of props and state plus a handle
/// back to the live instance.
pub struct This {
    props: Props,
    state: State,
    handle: ComponentHandle,
}

impl This {
    pub(crate) fn new(props: Props, state: State, handle: ComponentHandle) -> Self {
        Self {
            props,
            state,
            handle,
        }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn handle(&self) -> &ComponentHandle {
        &self.handle
    }

    pub fn set_state(&self, patch: impl Into<StatePatch>) {
        self.handle.set_state(patch)
    }

    pub fn set_state_with(&self, patch: impl Into<StatePatch>, callback: impl FnOnce() + 'static) {
        self.handle.set_state_with(patch, callback)
    }

    pub fn set_timeout(&self, delay: Duration, f: impl FnOnce() + 'static) -> Option<TimerId> {
        self.handle.set_timeout(delay, f)
    }
}

/// Weak reference to a mounted class instance. This is what a `ref` on a
/// class element receives.
#[derive(Clone)]
pub struct ComponentHandle {
    rt: Weak<Inner>,
    id: InstanceId,
}

impl ComponentHandle {
    pub(crate) fn new(rt: Weak<Inner>, id: InstanceId) -> Self {
        Self { rt, id }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn set_state(&self, patch: impl Into<StatePatch>) {
        self.enqueue(patch.into(), None)
    }

    pub fn set_state_with(&self, patch: impl Into<StatePatch>, callback: impl FnOnce() + 'static) {
        self.enqueue(patch.into(), Some(Box::new(callback)))
    }

    fn enqueue(&self, patch: StatePatch, callback: Option<Callback>) {
        match self.rt.upgrade() {
            Some(rt) => rt.enqueue_class_update(self.id, patch, callback),
            None => log::debug!("set_state after the runtime was dropped"),
        }
    }

    pub fn is_mounted(&self) -> bool {
        let Some(rt) = self.rt.upgrade() else {
            return false;
        };
        let instances = rt.instances.borrow();
        instances.get(self.id).is_some_and(|i| i.mounted)
    }

    pub fn state(&self) -> Option<State> {
        let rt = self.rt.upgrade()?;
        let instances = rt.instances.borrow();
        instances.get(self.id).map(|i| i.state.clone())
    }

    pub fn props(&self) -> Option<Props> {
        let rt = self.rt.upgrade()?;
        let instances = rt.instances.borrow();
        instances.get(self.id).map(|i| i.props.clone())
    }

    /// The concrete component behind this handle.
    pub fn downcast<T: Component>(&self) -> Option<Rc<T>> {
        let rt = self.rt.upgrade()?;
        let component: Rc<dyn Component> = rt.instances.borrow().get(self.id)?.component.clone();
        let any: Rc<dyn Any> = component;
        any.downcast::<T>().ok()
    }

    pub fn set_timeout(&self, delay: Duration, f: impl FnOnce() + 'static) -> Option<TimerId> {
        let rt = self.rt.upgrade()?;
        Some(rt.set_timeout(delay, Box::new(f)))
    }

    pub fn same_instance(&self, other: &ComponentHandle) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.rt, &other.rt)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentHandle").field(&self.id).finish()
    }
}

pub(crate) struct Instance {
    pub component: Rc<dyn Component>,
    pub class: ClassType,
    pub props: Props,
    pub state: State,
    pub updater: Updater,
    pub vnode: VNodeId,
    pub mounted: bool,
}

impl Inner {
    pub(crate) fn handle_for(&self, id: InstanceId) -> ComponentHandle {
        ComponentHandle::new(self.weak.clone(), id)
    }

    /// Current props/state of an instance packaged for a lifecycle call.
    pub(crate) fn this_for(&self, id: InstanceId) -> Option<(Rc<dyn Component>, This)> {
        let instances = self.instances.borrow();
        let inst = instances.get(id)?;
        let this = This::new(inst.props.clone(), inst.state.clone(), self.handle_for(id));
        Some((inst.component.clone(), this))
    }

    pub(crate) fn enqueue_class_update(
        &self,
        id: InstanceId,
        patch: StatePatch,
        callback: Option<Callback>,
    ) {
        {
            let mut instances = self.instances.borrow_mut();
            let Some(inst) = instances.get_mut(id) else {
                if self.config.warn_on_unmounted_updates {
                    log::warn!("set_state on an unmounted component is a no-op");
                }
                return;
            };
            inst.updater.enqueue(patch, callback);
        }
        self.schedule(UpdateTarget::Class(id));
    }

    /// Flushes one class instance: fold queued patches, derive, consult
    /// `should_component_update`, commit, re-render and patch. Lifecycle
    /// follow-ups are queued for the end of the current patch pass.
    pub(crate) fn launch_update(&self, id: InstanceId, next_props: Option<Props>) -> Result<()> {
        let (component, class, vnode, prev_props, prev_state, patches, callbacks) = {
            let mut instances = self.instances.borrow_mut();
            let Some(inst) = instances.get_mut(id) else {
                return Ok(());
            };
            if !inst.updater.has_pending() && next_props.is_none() {
                return Ok(());
            }
            let (patches, callbacks) = inst.updater.take();
            (
                inst.component.clone(),
                inst.class,
                inst.vnode,
                inst.props.clone(),
                inst.state.clone(),
                patches,
                callbacks,
            )
        };

        let mut next_state = prev_state.clone();
        for patch in patches {
            patch.apply_to(&mut next_state);
        }
        let next_props = next_props.unwrap_or_else(|| prev_props.clone());
        if let Some(derived) = class.derive_state(&next_props, &prev_state) {
            next_state.merge(derived);
        }

        let handle = self.handle_for(id);
        let previous = This::new(prev_props.clone(), prev_state.clone(), handle.clone());
        let should = component.should_component_update(&previous, &next_props, &next_state);

        {
            let mut instances = self.instances.borrow_mut();
            let Some(inst) = instances.get_mut(id) else {
                return Ok(());
            };
            inst.props = next_props.clone();
            inst.state = next_state.clone();
        }
        self.bump_stats(|s| s.state_commits += 1);

        if should {
            let this = This::new(next_props, next_state, handle);
            let rendered = component.render(&this);
            let snapshot = component.get_snapshot_before_update(&this, &prev_props, &prev_state);
            if let Err(err) = self.update_rendered(vnode, rendered.as_ref()) {
                log::warn!("patching {} abandoned: {err}", class.name());
            }
            self.post_pass.borrow_mut().push_back(PostPass::DidUpdate {
                id,
                prev_props,
                prev_state,
                snapshot,
            });
        } else {
            log::trace!("{} skipped render", class.name());
        }

        if !callbacks.is_empty() {
            self.post_pass
                .borrow_mut()
                .push_back(PostPass::Callbacks(callbacks));
        }
        Ok(())
    }
}

//! # Runtime
//!
//! [`Runtime`] owns everything a mounted UI needs: the host [`Document`], the
//! arenas of mounted nodes and class instances, the batch coordinator and the
//! scheduler. It is a cheap handle (`Rc`) and single-threaded.
//!
//! Work enters the runtime through a handful of entry points (`render`,
//! `dispatch_event`, timers and tasks, `set_state` outside a batch). Each
//! entry runs to completion; when the outermost one returns, queued
//! microtasks (layout effects) run. Inside an entry, host-tree patching
//! happens in *patch passes*; lifecycle follow-ups such as
//! `component_did_mount` and `set_state` callbacks are queued during a pass
//! and drained once the outermost pass has finished touching the tree.

use std::cell::{Cell, Ref as CellRef, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::{Rc, Weak};

use slotmap::SlotMap;
use web_time::Duration;

use crate::batch::{BatchCoordinator, Callback, UpdateTarget};
use crate::component::{Instance, InstanceId, State};
use crate::config::RuntimeConfig;
use crate::dom::{Document, HostId};
use crate::element::{Element, Props};
use crate::error::{Error, Result};
use crate::reconcile::{VNode, VNodeId};
use crate::scheduler::{Job, Scheduler, TimerId};
use crate::value::Value;

/// Counters since the runtime was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Outermost patch passes.
    pub patch_passes: u64,
    /// Class-component props/state commits.
    pub state_commits: u64,
    /// Mounted nodes created.
    pub mounts: u64,
    /// Mounted nodes torn down.
    pub unmounts: u64,
}

impl RenderStats {
    /// Difference to an earlier snapshot.
    pub fn since(&self, earlier: &RenderStats) -> RenderStats {
        RenderStats {
            patch_passes: self.patch_passes.saturating_sub(earlier.patch_passes),
            state_commits: self.state_commits.saturating_sub(earlier.state_commits),
            mounts: self.mounts.saturating_sub(earlier.mounts),
            unmounts: self.unmounts.saturating_sub(earlier.unmounts),
        }
    }
}

/// Follow-up work queued during a patch pass.
pub(crate) enum PostPass {
    DidMount(InstanceId),
    DidUpdate {
        id: InstanceId,
        prev_props: Props,
        prev_state: State,
        snapshot: Option<Value>,
    },
    Callbacks(Vec<Callback>),
    /// An update requested while the tree was being patched.
    Flush(UpdateTarget),
}

pub(crate) struct Inner {
    pub weak: Weak<Inner>,
    pub config: RuntimeConfig,
    pub document: RefCell<Document>,
    pub vnodes: RefCell<SlotMap<VNodeId, VNode>>,
    pub instances: RefCell<SlotMap<InstanceId, Instance>>,
    pub batch: RefCell<BatchCoordinator>,
    pub scheduler: RefCell<Scheduler>,
    pub post_pass: RefCell<VecDeque<PostPass>>,
    pub delegated: RefCell<HashSet<Rc<str>>>,
    pub roots: RefCell<Vec<(HostId, VNodeId)>>,
    stats: Cell<RenderStats>,
    entry_depth: Cell<usize>,
    patch_depth: Cell<usize>,
    commit_depth: Cell<usize>,
}

#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<Inner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let inner = Rc::new_cyclic(|weak| Inner {
            weak: weak.clone(),
            config,
            document: RefCell::new(Document::new()),
            vnodes: RefCell::new(SlotMap::with_key()),
            instances: RefCell::new(SlotMap::with_key()),
            batch: RefCell::new(BatchCoordinator::default()),
            scheduler: RefCell::new(Scheduler::default()),
            post_pass: RefCell::new(VecDeque::new()),
            delegated: RefCell::new(HashSet::new()),
            roots: RefCell::new(Vec::new()),
            stats: Cell::new(RenderStats::default()),
            entry_depth: Cell::new(0),
            patch_depth: Cell::new(0),
            commit_depth: Cell::new(0),
        });
        Self { inner }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Creates an element attached to the document body for use as a render
    /// container.
    pub fn create_container(&self, tag: &str) -> HostId {
        let mut doc = self.inner.document.borrow_mut();
        let container = doc.create_element(tag);
        let body = doc.body();
        if let Err(err) = doc.append_child(body, container) {
            log::error!("attaching container failed: {err}");
        }
        container
    }

    /// Mounts `element` and appends its host node to `container`. Repeated
    /// calls append further roots.
    pub fn render(&self, element: Element, container: HostId) -> Result<()> {
        let inner = &self.inner;
        if !inner.document.borrow().exists(container) {
            return Err(Error::HostNodeMissing(container));
        }
        inner.enter(|| {
            inner.patch_pass(|| {
                let id = inner.create(&element, Some(container))?;
                inner.roots.borrow_mut().push((container, id));
                if let Some(host) = inner.host_of(id) {
                    inner.document.borrow_mut().append_child(container, host)?;
                }
                log::debug!("rendered <{}> into {container:?}", element.ty().name());
                Ok(())
            })
        })
    }

    /// Unmounts every root rendered into `container`.
    pub fn unmount_container(&self, container: HostId) -> Result<()> {
        let inner = &self.inner;
        let roots: Vec<VNodeId> = {
            let mut roots = inner.roots.borrow_mut();
            let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *roots)
                .into_iter()
                .partition(|(c, _)| *c == container);
            *roots = rest;
            mine.into_iter().map(|(_, id)| id).collect()
        };
        inner.enter(|| {
            inner.patch_pass(|| {
                for id in roots {
                    inner.remove(id)?;
                }
                Ok(())
            })
        })
    }

    pub fn document(&self) -> CellRef<'_, Document> {
        self.inner.document.borrow()
    }

    pub fn stats(&self) -> RenderStats {
        self.inner.stats.get()
    }

    /// Number of live class instances.
    pub fn instance_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    /// Runs `f` with batching on: every `set_state` and hook setter inside is
    /// deferred, and each affected component flushes exactly once after `f`
    /// returns, in one patch pass.
    pub fn batched_updates<R>(&self, f: impl FnOnce() -> R) -> R {
        let inner = &self.inner;
        inner.enter(|| {
            inner.batch.borrow_mut().begin();
            let result = f();
            let pending = inner.batch.borrow_mut().end();
            if let Some(targets) = pending {
                inner.patch_pass(|| {
                    for target in targets {
                        inner.flush_target(target);
                    }
                });
            }
            result
        })
    }

    pub fn set_timeout(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerId {
        self.inner.set_timeout(delay, Box::new(f))
    }

    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.scheduler.borrow_mut().clear_timeout(id)
    }

    pub fn now(&self) -> Duration {
        self.inner.scheduler.borrow().now()
    }

    /// Runs microtasks, tasks and timers (advancing the virtual clock to
    /// each deadline) until nothing is left.
    pub fn run_until_idle(&self) {
        const MAX_JOBS: usize = 100_000;
        let inner = &self.inner;
        for _ in 0..MAX_JOBS {
            inner.run_microtasks();
            let job = {
                let mut scheduler = inner.scheduler.borrow_mut();
                scheduler.pop_task().or_else(|| scheduler.pop_timer(None))
            };
            match job {
                Some(job) => inner.enter(job),
                None => return,
            }
        }
        log::error!("run_until_idle gave up after {MAX_JOBS} jobs; something keeps rescheduling");
    }

    /// Moves the virtual clock forward by `delta`, running every task and
    /// every timer that falls due on the way.
    pub fn advance_timers_by(&self, delta: Duration) {
        let inner = &self.inner;
        let target = inner.scheduler.borrow().now() + delta;
        loop {
            inner.run_microtasks();
            let job = {
                let mut scheduler = inner.scheduler.borrow_mut();
                scheduler
                    .pop_task()
                    .or_else(|| scheduler.pop_timer(Some(target)))
            };
            match job {
                Some(job) => inner.enter(job),
                None => break,
            }
        }
        inner.scheduler.borrow_mut().advance_to(target);
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.scheduler.borrow().pending_timers()
    }
}

impl Inner {
    pub(crate) fn bump_stats(&self, f: impl FnOnce(&mut RenderStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    pub(crate) fn set_timeout(&self, delay: Duration, job: Job) -> TimerId {
        self.scheduler.borrow_mut().set_timeout(delay, job)
    }

    /// Runs an entry point. The outermost entry ends with a microtask
    /// checkpoint.
    pub(crate) fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.entry_depth.get();
        self.entry_depth.set(depth + 1);
        let result = f();
        self.entry_depth.set(depth);
        if depth == 0 {
            self.run_microtasks();
        }
        result
    }

    pub(crate) fn run_microtasks(&self) {
        self.entry_depth.set(self.entry_depth.get() + 1);
        loop {
            let job = self.scheduler.borrow_mut().pop_microtask();
            match job {
                Some(job) => job(),
                None => break,
            }
        }
        self.entry_depth.set(self.entry_depth.get() - 1);
    }

    /// Runs `f` as (part of) a patch pass. Follow-ups queued during the pass
    /// run once the outermost pass returns.
    pub(crate) fn patch_pass<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.patch_depth.get();
        if depth == 0 {
            self.bump_stats(|s| s.patch_passes += 1);
        }
        self.patch_depth.set(depth + 1);
        let result = f();
        self.patch_depth.set(depth);
        if depth == 0 {
            self.drain_post_pass();
        }
        result
    }

    fn drain_post_pass(&self) {
        let depth = self.commit_depth.get();
        if depth >= self.config.max_update_depth {
            let err = Error::UpdateDepthExceeded(self.config.max_update_depth);
            log::error!("{err}");
            self.post_pass.borrow_mut().clear();
            for inst in self.instances.borrow_mut().values_mut() {
                inst.updater.clear();
            }
            return;
        }
        self.commit_depth.set(depth + 1);
        loop {
            let next = self.post_pass.borrow_mut().pop_front();
            let Some(item) = next else {
                break;
            };
            self.run_post_pass(item);
        }
        self.commit_depth.set(depth);
    }

    fn run_post_pass(&self, item: PostPass) {
        match item {
            PostPass::DidMount(id) => {
                if let Some(inst) = self.instances.borrow_mut().get_mut(id) {
                    inst.mounted = true;
                }
                if let Some((component, this)) = self.this_for(id) {
                    component.component_did_mount(&this);
                }
            }
            PostPass::DidUpdate {
                id,
                prev_props,
                prev_state,
                snapshot,
            } => {
                if let Some((component, this)) = self.this_for(id) {
                    component.component_did_update(&this, &prev_props, &prev_state, snapshot);
                }
            }
            PostPass::Callbacks(callbacks) => {
                for callback in callbacks {
                    callback();
                }
            }
            PostPass::Flush(target) => self.patch_pass(|| self.flush_target(target)),
        }
    }

    /// Routes an update request: queued while batching, deferred while the
    /// tree is being patched, flushed synchronously otherwise.
    pub(crate) fn schedule(&self, target: UpdateTarget) {
        if self.batch.borrow().is_batching() {
            self.batch.borrow_mut().enqueue(target);
            return;
        }
        if self.patch_depth.get() > 0 {
            self.post_pass.borrow_mut().push_back(PostPass::Flush(target));
            return;
        }
        self.enter(|| self.patch_pass(|| self.flush_target(target)));
    }

    pub(crate) fn flush_target(&self, target: UpdateTarget) {
        let result = match target {
            UpdateTarget::Class(id) => self.launch_update(id, None),
            UpdateTarget::Function(id) => self.update_function(id),
        };
        if let Err(err) = result {
            log::warn!("update of {target:?} abandoned: {err}");
        }
    }
}

//! Per-instance update queues and the batch coordinator.

use crate::component::{InstanceId, StatePatch};
use crate::reconcile::VNodeId;

pub type Callback = Box<dyn FnOnce()>;

/// Pending state patches of one class instance and the callbacks paired with
/// them. Both are drained together when the instance flushes.
#[derive(Default)]
pub struct Updater {
    pending_states: Vec<StatePatch>,
    pending_callbacks: Vec<Callback>,
}

impl Updater {
    pub fn enqueue(&mut self, patch: StatePatch, callback: Option<Callback>) {
        self.pending_states.push(patch);
        if let Some(cb) = callback {
            self.pending_callbacks.push(cb);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_states.is_empty() || !self.pending_callbacks.is_empty()
    }

    pub fn take(&mut self) -> (Vec<StatePatch>, Vec<Callback>) {
        (
            std::mem::take(&mut self.pending_states),
            std::mem::take(&mut self.pending_callbacks),
        )
    }

    pub fn clear(&mut self) {
        self.pending_states.clear();
        self.pending_callbacks.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    Class(InstanceId),
    Function(VNodeId),
}

/// Batching flag (kept as a depth so regions nest) and the ordered set of
/// targets waiting for the outermost region to close.
#[derive(Debug, Default)]
pub struct BatchCoordinator {
    depth: usize,
    pending: Vec<UpdateTarget>,
}

impl BatchCoordinator {
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Closes a region. The outermost close clears the flag and hands back
    /// every queued target in first-enqueue order.
    pub fn end(&mut self) -> Option<Vec<UpdateTarget>> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 || self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }

    /// Returns `false` when the target was already queued.
    pub fn enqueue(&mut self, target: UpdateTarget) -> bool {
        if self.pending.iter().any(|t| t == &target) {
            return false;
        }
        log::trace!("batching update for {target:?}");
        self.pending.push(target);
        true
    }

    pub fn pending(&self) -> &[UpdateTarget] {
        &self.pending
    }
}

//! Virtual clock with microtask, task and timer queues.
//!
//! Nothing here runs on its own: the runtime drains microtasks after every
//! outermost entry, and tests drive tasks and timers through
//! [`Runtime::run_until_idle`](crate::Runtime::run_until_idle) and
//! [`Runtime::advance_timers_by`](crate::Runtime::advance_timers_by).

use std::collections::{BTreeMap, HashMap, VecDeque};

use web_time::Duration;

pub type Job = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Default)]
pub struct Scheduler {
    now: Duration,
    microtasks: VecDeque<Job>,
    tasks: VecDeque<Job>,
    timers: BTreeMap<(Duration, TimerId), Job>,
    deadlines: HashMap<TimerId, Duration>,
    next_timer: u64,
}

impl Scheduler {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn queue_microtask(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub fn queue_task(&mut self, job: Job) {
        self.tasks.push_back(job);
    }

    pub fn set_timeout(&mut self, delay: Duration, job: Job) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        let deadline = self.now + delay;
        self.timers.insert((deadline, id), job);
        self.deadlines.insert(id, deadline);
        id
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.timers.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    pub fn pop_microtask(&mut self) -> Option<Job> {
        self.microtasks.pop_front()
    }

    pub fn pop_task(&mut self) -> Option<Job> {
        self.tasks.pop_front()
    }

    /// Earliest timer due at or before `limit`; advances the clock to its
    /// deadline.
    pub fn pop_timer(&mut self, limit: Option<Duration>) -> Option<Job> {
        let (&(deadline, id), _) = self.timers.first_key_value()?;
        if limit.is_some_and(|limit| deadline > limit) {
            return None;
        }
        let job = self.timers.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some(job)
    }

    pub fn advance_to(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.microtasks.is_empty() && self.tasks.is_empty() && self.timers.is_empty()
    }
}

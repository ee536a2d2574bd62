//! Work deferred to the next turn of the event loop.
//!
//! The queue only stores closures. The loop pops them one at a time, so a
//! task that posts another task sees it run later in the same drain.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a posted task until it runs or is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static TASK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A deferred closure, used for both tasks and timer callbacks.
pub type BoxedTask = Box<dyn FnOnce() + 'static>;

/// First-in first-out store of deferred closures.
#[derive(Default)]
pub struct TaskQueue {
    pending: VecDeque<(TaskId, BoxedTask)>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` behind everything already posted.
    pub fn post(&mut self, task: impl FnOnce() + 'static) -> TaskId {
        let id = TaskId(TASK_COUNTER.fetch_add(1, Ordering::Relaxed));
        self.pending.push_back((id, Box::new(task)));
        id
    }

    /// Drop a task that has not run yet. `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(queued, _)| *queued != id);
        self.pending.len() != before
    }

    pub fn pop(&mut self) -> Option<(TaskId, BoxedTask)> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

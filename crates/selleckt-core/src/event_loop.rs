//! Single-threaded event loop with deferred tasks and virtual-time timers.
//!
//! The loop is driven explicitly: [`EventLoop::run_until_idle`] drains the
//! task queue and [`EventLoop::advance`] moves the virtual clock, firing
//! timers in order. Tasks and timer callbacks always run with no internal
//! lock held, so they may post further tasks or start and stop timers.
//!
//! # Example
//!
//! ```
//! use selleckt_core::EventLoop;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new();
//! let fired = Rc::new(Cell::new(false));
//!
//! let fired_clone = fired.clone();
//! event_loop.start_timer(Duration::from_millis(10), move || fired_clone.set(true));
//!
//! event_loop.advance(Duration::from_millis(5), || {});
//! assert!(!fired.get());
//! event_loop.advance(Duration::from_millis(5), || {});
//! assert!(fired.get());
//! ```

use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, TaskError};
use crate::logging::targets;
use crate::task::{TaskId, TaskQueue};
use crate::timer::{TimerId, TimerManager};

/// Upper bound on tasks run by one `run_until_idle` call.
///
/// A task that keeps re-posting itself would otherwise never let the loop
/// become idle.
const MAX_TASKS_PER_IDLE: usize = 10_000;

/// The event loop shared by everything attached to one page.
pub struct EventLoop {
    tasks: Mutex<TaskQueue>,
    timers: Mutex<TimerManager>,
}

impl EventLoop {
    /// Create an idle event loop with the clock at zero.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(TaskQueue::new()),
            timers: Mutex::new(TimerManager::new()),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.timers.lock().now()
    }

    /// Post a task to run on the next turn of the loop.
    pub fn post_task<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        let id = self.tasks.lock().post(task);
        tracing::trace!(target: targets::EVENT_LOOP, task = id.as_u64(), "task posted");
        id
    }

    /// Cancel a task that has not run yet.
    pub fn cancel_task(&self, id: TaskId) -> Result<()> {
        if self.tasks.lock().cancel(id) {
            Ok(())
        } else {
            Err(TaskError::InvalidTaskId.into())
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.lock().pending_count()
    }

    /// Start a one-shot timer relative to the current virtual time.
    pub fn start_timer<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let id = self.timers.lock().start_one_shot(delay, Box::new(callback));
        tracing::trace!(target: targets::EVENT_LOOP, ?id, ?delay, "timer started");
        id
    }

    /// Stop a pending timer.
    pub fn stop_timer(&self, id: TimerId) -> Result<()> {
        self.timers.lock().stop(id)
    }

    /// Whether a timer is still pending.
    pub fn is_timer_active(&self, id: TimerId) -> bool {
        self.timers.lock().is_active(id)
    }

    /// Number of pending timers.
    pub fn active_timers(&self) -> usize {
        self.timers.lock().active_count()
    }

    /// Time until the next pending timer fires.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        self.timers.lock().time_until_next()
    }

    /// Run the oldest pending task, if any.
    ///
    /// Returns `true` when a task ran.
    pub fn run_one_task(&self) -> bool {
        // The guard is a temporary, so the lock is released before the task runs.
        let next = self.tasks.lock().pop();
        match next {
            Some((id, task)) => {
                tracing::trace!(target: targets::EVENT_LOOP, task = id.as_u64(), "running task");
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty.
    ///
    /// Returns the number of tasks that ran.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while count < MAX_TASKS_PER_IDLE && self.run_one_task() {
            count += 1;
        }
        if count == MAX_TASKS_PER_IDLE {
            tracing::warn!(target: targets::EVENT_LOOP, "task queue did not drain; stopping early");
        }
        count
    }

    /// Move the clock forward by `duration`, firing every timer that falls due.
    ///
    /// `settle` runs before each timer and once at the end; callers use it to
    /// drain tasks (and anything else they queue) so that work scheduled by a
    /// timer completes before the next timer fires.
    pub fn advance<F>(&self, duration: Duration, mut settle: F)
    where
        F: FnMut(),
    {
        let deadline = self.now() + duration;
        tracing::debug!(target: targets::EVENT_LOOP, ?deadline, "advancing clock");
        loop {
            settle();
            let expired = self.timers.lock().pop_expired(deadline);
            match expired {
                Some((_, callback)) => callback(),
                None => break,
            }
        }
        self.timers.lock().advance_to(deadline);
        settle();
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_task_may_post_task() {
        let event_loop = Rc::new(EventLoop::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let loop_clone = event_loop.clone();
        let log_clone = log.clone();
        event_loop.post_task(move || {
            log_clone.borrow_mut().push("outer");
            let log_inner = log_clone.clone();
            loop_clone.post_task(move || log_inner.borrow_mut().push("inner"));
        });

        assert_eq!(event_loop.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_cancel_task() {
        let event_loop = EventLoop::new();
        let id = event_loop.post_task(|| panic!("cancelled task ran"));

        assert!(event_loop.cancel_task(id).is_ok());
        assert!(event_loop.cancel_task(id).is_err());
        assert_eq!(event_loop.run_until_idle(), 0);
    }

    #[test]
    fn test_timer_callback_tasks_settle_before_next_timer() {
        let event_loop = Rc::new(EventLoop::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let loop_clone = event_loop.clone();
        let log_clone = log.clone();
        event_loop.start_timer(Duration::from_millis(5), move || {
            log_clone.borrow_mut().push("first timer");
            let log_task = log_clone.clone();
            loop_clone.post_task(move || log_task.borrow_mut().push("task"));
        });
        let log_clone = log.clone();
        event_loop.start_timer(Duration::from_millis(6), move || {
            log_clone.borrow_mut().push("second timer");
        });

        let settle_loop = event_loop.clone();
        event_loop.advance(Duration::from_millis(10), || {
            settle_loop.run_until_idle();
        });

        assert_eq!(*log.borrow(), vec!["first timer", "task", "second timer"]);
        assert_eq!(event_loop.now(), Duration::from_millis(10));
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let event_loop = EventLoop::new();
        let id = event_loop.start_timer(Duration::from_millis(1), || panic!("stopped timer fired"));

        assert!(event_loop.is_timer_active(id));
        event_loop.stop_timer(id).expect("timer was pending");
        event_loop.advance(Duration::from_secs(1), || {});
        assert_eq!(event_loop.active_timers(), 0);
    }
}

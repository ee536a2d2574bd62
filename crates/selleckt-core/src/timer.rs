//! One-shot timers on a virtual clock.
//!
//! Time only moves when the owner advances it, which keeps debounced widget
//! behavior deterministic. Timers due at the same instant fire in start order.

use std::collections::BTreeMap;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, TimerError};
use crate::logging::targets;
use crate::task::BoxedTask;

new_key_type! {
    /// Handle to a pending timer.
    pub struct TimerId;
}

/// Position in the schedule: fire time, then start sequence.
type Slot = (Duration, u64);

struct Pending {
    slot: Slot,
    callback: BoxedTask,
}

/// Pending one-shot timers plus the virtual clock they run against.
#[derive(Default)]
pub struct TimerManager {
    now: Duration,
    pending: SlotMap<TimerId, Pending>,
    schedule: BTreeMap<Slot, TimerId>,
    started: u64,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `callback` to fire `delay` after the current virtual time.
    pub fn start_one_shot(&mut self, delay: Duration, callback: BoxedTask) -> TimerId {
        let slot = (self.now + delay, self.started);
        self.started += 1;
        let id = self.pending.insert(Pending { slot, callback });
        self.schedule.insert(slot, id);
        id
    }

    /// Cancel a pending timer. Fails if it already fired or was stopped.
    pub fn stop(&mut self, id: TimerId) -> Result<()> {
        let pending = self.pending.remove(id).ok_or(TimerError::InvalidTimerId)?;
        self.schedule.remove(&pending.slot);
        Ok(())
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.pending.contains_key(id)
    }

    /// Time left before the earliest pending timer fires.
    pub fn time_until_next(&self) -> Option<Duration> {
        self.schedule
            .keys()
            .next()
            .map(|(at, _)| at.saturating_sub(self.now))
    }

    /// Take the earliest timer due at or before `deadline`, moving the clock
    /// to its fire time.
    ///
    /// The callback is handed back instead of run so the caller can release
    /// its locks first.
    pub fn pop_expired(&mut self, deadline: Duration) -> Option<(TimerId, BoxedTask)> {
        let (&slot, &id) = self.schedule.first_key_value()?;
        if slot.0 > deadline {
            return None;
        }
        self.schedule.remove(&slot);
        let pending = self.pending.remove(id)?;
        self.now = self.now.max(slot.0);
        tracing::trace!(target: targets::TIMER, ?id, at = ?self.now, "timer fired");
        Some((id, pending.callback))
    }

    /// Move the clock forward. Moving it backwards is ignored.
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }

    pub fn active_count(&self) -> usize {
        self.pending.len()
    }
}

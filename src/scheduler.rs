//! Cooperative tick scheduler.
//!
//! A fixed-slot, allocation-free timer wheel over a 10 ms base tick.
//! Entries are one-shot; periodic activities re-arm themselves from
//! their own handler, which is what lets the safety layer stop an
//! activity simply by cancelling its pending handle.
//!
//! Handles are generational: freeing a slot bumps its generation, so a
//! stale handle (already fired or already cancelled) can never cancel
//! a later occupant of the same slot. Cancelling an invalid handle is
//! a defined no-op.

use heapless::Vec;

/// Scheduler capacity. One slot per periodic activity, plus headroom.
pub const MAX_TASKS: usize = 4;

/// The periodic activities the node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Battery acquisition + undervoltage evaluation (500 ms).
    BatteryMonitor,
    /// External sense pad acquisition (1 s).
    SensorSample,
    /// Bias control-loop update (500 ms).
    BiasUpdate,
}

/// Opaque token for a pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleHandle {
    slot: u8,
    generation: u8,
}

impl ScheduleHandle {
    /// The "none" sentinel. Cancelling it does nothing.
    pub const INVALID: Self = Self {
        slot: u8::MAX,
        generation: 0,
    };

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for ScheduleHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    entry: Option<(Task, u32)>,
    generation: u8,
}

/// Fixed-slot one-shot scheduler.
pub struct TickScheduler {
    slots: [Slot; MAX_TASKS],
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            slots: [Slot {
                entry: None,
                generation: 0,
            }; MAX_TASKS],
        }
    }

    /// Arm `task` to fire after `ticks` base ticks (a zero delay still
    /// waits for the next tick). Returns [`ScheduleHandle::INVALID`]
    /// when every slot is occupied.
    pub fn schedule_after(&mut self, ticks: u32, task: Task) -> ScheduleHandle {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.is_none() {
                slot.entry = Some((task, ticks.max(1)));
                return ScheduleHandle {
                    slot: i as u8,
                    generation: slot.generation,
                };
            }
        }
        ScheduleHandle::INVALID
    }

    /// Cancel a pending entry and reset the handle to the sentinel.
    /// Stale or invalid handles are ignored.
    pub fn cancel(&mut self, handle: &mut ScheduleHandle) {
        if handle.is_valid() {
            if let Some(slot) = self.slots.get_mut(usize::from(handle.slot)) {
                if slot.generation == handle.generation && slot.entry.is_some() {
                    slot.entry = None;
                    slot.generation = slot.generation.wrapping_add(1);
                }
            }
        }
        *handle = ScheduleHandle::INVALID;
    }

    /// Advance one base tick and collect every task that fired.
    /// Fired entries are freed; handlers re-arm as needed.
    pub fn tick(&mut self) -> Vec<Task, MAX_TASKS> {
        let mut fired = Vec::new();
        for slot in &mut self.slots {
            if let Some((task, remaining)) = slot.entry {
                if remaining <= 1 {
                    slot.entry = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    // Capacity equals the slot count, push cannot fail.
                    let _ = fired.push(task);
                } else {
                    slot.entry = Some((task, remaining - 1));
                }
            }
        }
        fired
    }

    /// Number of pending entries, for diagnostics and tests.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_the_requested_delay() {
        let mut s = TickScheduler::new();
        s.schedule_after(3, Task::BatteryMonitor);
        assert!(s.tick().is_empty());
        assert!(s.tick().is_empty());
        let fired = s.tick();
        assert_eq!(fired.as_slice(), &[Task::BatteryMonitor]);
        // One-shot: nothing pending afterwards.
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut s = TickScheduler::new();
        s.schedule_after(0, Task::SensorSample);
        assert_eq!(s.tick().as_slice(), &[Task::SensorSample]);
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut s = TickScheduler::new();
        let mut h = s.schedule_after(2, Task::BiasUpdate);
        s.cancel(&mut h);
        assert_eq!(h, ScheduleHandle::INVALID);
        assert!(s.tick().is_empty());
        assert!(s.tick().is_empty());
    }

    #[test]
    fn double_cancel_is_a_no_op() {
        let mut s = TickScheduler::new();
        let mut h = s.schedule_after(5, Task::BatteryMonitor);
        s.cancel(&mut h);
        assert_eq!(h, ScheduleHandle::INVALID);
        s.cancel(&mut h);
        assert_eq!(h, ScheduleHandle::INVALID);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn stale_handle_cannot_cancel_a_reused_slot() {
        let mut s = TickScheduler::new();
        let mut old = s.schedule_after(1, Task::BatteryMonitor);
        assert_eq!(s.tick().len(), 1);
        // Slot is free again; a new entry takes it with a new generation.
        let _new = s.schedule_after(10, Task::SensorSample);
        assert_eq!(s.pending(), 1);
        s.cancel(&mut old);
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn saturated_scheduler_returns_the_sentinel() {
        let mut s = TickScheduler::new();
        for _ in 0..MAX_TASKS {
            assert!(s.schedule_after(10, Task::BiasUpdate).is_valid());
        }
        assert_eq!(
            s.schedule_after(10, Task::BiasUpdate),
            ScheduleHandle::INVALID
        );
    }

    #[test]
    fn independent_entries_fire_independently() {
        let mut s = TickScheduler::new();
        s.schedule_after(1, Task::BatteryMonitor);
        s.schedule_after(2, Task::BiasUpdate);
        assert_eq!(s.tick().as_slice(), &[Task::BatteryMonitor]);
        assert_eq!(s.tick().as_slice(), &[Task::BiasUpdate]);
    }
}

//! Scheduled Transition Timers
//!
//! The escalation engine's timed transitions (warning hold, critical
//! escalation, resolve hold) are deadlines in this queue, keyed by
//! `(sensor_id, alert_id, kind)`. The engine polls due entries from
//! `tick(now)`; nothing here reads a clock.
//!
//! Cancellation is idempotent: cancelling a missing key is a no-op, and a
//! popped entry is gone, so a timer can never fire twice for the same
//! alert.

use heapless::Vec;

use crate::events::{AlertId, InlineString};
use crate::time::Timestamp;

/// What a deadline means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum TimerKind {
    /// Warning persisted past the zone's warning hold: becomes Critical.
    WarningHold = 0,
    /// Critical persisted past the zone's critical hold: becomes
    /// Escalated. Fires even with no new readings.
    Escalate = 1,
    /// Normal readings persisted past the resolve hold: alert closes.
    ResolveHold = 2,
}

/// A scheduled deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    /// When the timer fires.
    pub due: Timestamp,
    /// Sensor the timer belongs to.
    pub sensor_id: InlineString,
    /// Alert the timer belongs to.
    pub alert_id: AlertId,
    /// Transition the timer drives.
    pub kind: TimerKind,
}

/// Fixed-capacity deadline set.
///
/// Linear-scan pop keeps the structure trivially correct; capacities are
/// small (two timers per sensor worst case). Ties on `due` break by
/// sensor id then kind so firing order is deterministic.
pub struct TimerQueue<const N: usize> {
    entries: Vec<TimerEntry, N>,
}

impl<const N: usize> TimerQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Schedule a deadline, replacing any existing timer with the same
    /// key. Returns false if the queue is full.
    pub fn schedule(
        &mut self,
        sensor_id: InlineString,
        alert_id: AlertId,
        kind: TimerKind,
        due: Timestamp,
    ) -> bool {
        self.cancel(&sensor_id, alert_id, kind);
        self.entries
            .push(TimerEntry {
                due,
                sensor_id,
                alert_id,
                kind,
            })
            .is_ok()
    }

    /// Cancel one timer. Idempotent; returns whether a timer existed.
    pub fn cancel(&mut self, sensor_id: &InlineString, alert_id: AlertId, kind: TimerKind) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.sensor_id == *sensor_id && e.alert_id == alert_id && e.kind == kind));
        self.entries.len() != before
    }

    /// Cancel every timer belonging to an alert. Idempotent.
    pub fn cancel_alert(&mut self, sensor_id: &InlineString, alert_id: AlertId) {
        self.entries
            .retain(|e| !(e.sensor_id == *sensor_id && e.alert_id == alert_id));
    }

    /// Pop the earliest entry with `due <= now`, if any.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<TimerEntry> {
        let mut best: Option<usize> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if e.due > now {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(j) => {
                    let cur = &self.entries[j];
                    if (e.due, e.sensor_id, e.kind) < (cur.due, cur.sensor_id, cur.kind) {
                        Some(i)
                    } else {
                        Some(j)
                    }
                }
            };
        }
        best.map(|i| self.entries.swap_remove(i))
    }

    /// Number of scheduled timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timers are scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for TimerQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::<8>::new();
        q.schedule(id("s2"), 2, TimerKind::Escalate, 2000);
        q.schedule(id("s1"), 1, TimerKind::WarningHold, 1000);

        assert!(q.pop_due(500).is_none());

        let first = q.pop_due(3000).unwrap();
        assert_eq!(first.sensor_id, id("s1"));
        let second = q.pop_due(3000).unwrap();
        assert_eq!(second.sensor_id, id("s2"));
        assert!(q.pop_due(3000).is_none());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut q = TimerQueue::<8>::new();
        q.schedule(id("s1"), 1, TimerKind::Escalate, 1000);

        assert!(q.cancel(&id("s1"), 1, TimerKind::Escalate));
        assert!(!q.cancel(&id("s1"), 1, TimerKind::Escalate));
        assert!(q.pop_due(2000).is_none());
    }

    #[test]
    fn schedule_replaces_same_key() {
        let mut q = TimerQueue::<8>::new();
        q.schedule(id("s1"), 1, TimerKind::Escalate, 1000);
        q.schedule(id("s1"), 1, TimerKind::Escalate, 5000);

        assert_eq!(q.len(), 1);
        assert!(q.pop_due(1000).is_none());
        assert!(q.pop_due(5000).is_some());
    }

    #[test]
    fn cancel_alert_removes_all_kinds() {
        let mut q = TimerQueue::<8>::new();
        q.schedule(id("s1"), 1, TimerKind::WarningHold, 1000);
        q.schedule(id("s1"), 1, TimerKind::ResolveHold, 2000);
        q.schedule(id("s1"), 2, TimerKind::Escalate, 3000);

        q.cancel_alert(&id("s1"), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(5000).unwrap().alert_id, 2);
    }
}

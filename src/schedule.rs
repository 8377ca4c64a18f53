//! The ordered sequence of pending actions (spec.md §3 "Schedule").
//!
//! A schedule is a time-sorted, insertion-order-stable list of
//! `(timestamp, action)` pairs. Stability matters: within one tick several
//! actions can share a timestamp (e.g. a migration decided by the
//! scheduler alongside a boot admitted in the same period), and the order
//! they were queued in is the order they commit.

use crate::action::Action;
use crate::timeseries::Timestamp;

#[derive(Debug, Clone)]
pub struct Schedule {
    entries: Vec<(Timestamp, Action)>,
}

impl Schedule {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Inserts `(at, action)` keeping the list sorted by timestamp; ties
    /// are broken by insertion order (`sort_by_key` is stable).
    pub fn add(&mut self, at: Timestamp, action: Action) {
        self.entries.push((at, action));
        self.entries.sort_by_key(|(t, _)| *t);
    }

    /// All actions due in `[period_start, period_start + period]`, in
    /// schedule order, matching the simulator's per-tick commit window
    /// (spec.md §4.H). Inclusive of the upper bound: the Python original
    /// slices with pandas label-based indexing (`schedule.actions[t :
    /// t+period]`), which is inclusive at both ends, and the scheduler
    /// deliberately schedules relocation migrations at exactly
    /// `t + period` ("at the end of this timeframe") expecting them to
    /// be picked up by the tick that produced them.
    pub fn filter_current_actions(&self, period_start: Timestamp, period: chrono::Duration) -> Vec<(Timestamp, &Action)> {
        let period_end = period_start + period;
        self.entries
            .iter()
            .filter(|(t, _)| *t >= period_start && *t <= period_end)
            .map(|(t, a)| (*t, a))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Timestamp, Action)> {
        self.entries.iter()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerId;
    use crate::vm::VmId;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(h: i64) -> Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn add_keeps_sorted_order() {
        let mut s = Schedule::new();
        s.add(ts(2), Action::Pause(VmId(1)));
        s.add(ts(0), Action::Migrate(VmId(2), ServerId(1)));
        s.add(ts(1), Action::Unpause(VmId(1)));
        let times: Vec<_> = s.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![ts(0), ts(1), ts(2)]);
    }

    #[test]
    fn filter_current_actions_is_inclusive_of_period_end() {
        let mut s = Schedule::new();
        s.add(ts(0), Action::Migrate(VmId(1), ServerId(1)));
        s.add(ts(2), Action::Migrate(VmId(2), ServerId(1)));
        s.add(ts(3), Action::Migrate(VmId(3), ServerId(1)));
        let current = s.filter_current_actions(ts(0), Duration::hours(2));
        assert_eq!(current.len(), 2);
    }
}

//! Time-indexed ordered series with range queries and resampling.
//!
//! Per the design notes (spec.md §9): "Time series are an ordered map from
//! timestamp → value with logarithmic range queries; the implementation
//! must support `series[a:b]` slicing and `resample` to a coarser
//! frequency." `BTreeMap` gives the ordered, `O(log n)`-range-query map;
//! `range()` gives the slicing.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

/// Absolute simulation timestamp.
pub type Timestamp = DateTime<Utc>;

/// A single location's (or VM's, or any other keyed series') values
/// indexed by timestamp, kept in timestamp order.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    points: BTreeMap<Timestamp, f64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { points: BTreeMap::new() }
    }

    pub fn insert(&mut self, t: Timestamp, value: f64) {
        self.points.insert(t, value);
    }

    pub fn get(&self, t: Timestamp) -> Option<f64> {
        self.points.get(&t).copied()
    }

    /// The last known value at or before `t` (used by cost-key lookups
    /// that may fall between two sampled points).
    pub fn get_or_hold(&self, t: Timestamp) -> Option<f64> {
        self.points.range(..=t).next_back().map(|(_, v)| *v)
    }

    /// `series[start:end)` slice, inclusive of `start`, exclusive of `end`.
    pub fn slice(&self, start: Timestamp, end: Timestamp) -> Vec<(Timestamp, f64)> {
        self.points.range(start..end).map(|(t, v)| (*t, *v)).collect()
    }

    /// Mean value over `[start, end)`. Returns `None` if the slice is empty.
    pub fn mean(&self, start: Timestamp, end: Timestamp) -> Option<f64> {
        let slice = self.slice(start, end);
        if slice.is_empty() {
            return None;
        }
        Some(slice.iter().map(|(_, v)| v).sum::<f64>() / slice.len() as f64)
    }

    /// Resample to a coarser frequency by forward-filling: every tick of
    /// `freq` starting at `start` takes the last known value at or before
    /// that tick, like pandas' `resample(...).pad()` used throughout the
    /// Python original.
    pub fn resample(&self, start: Timestamp, end: Timestamp, freq: Duration) -> TimeSeries {
        let mut out = TimeSeries::new();
        let mut t = start;
        while t <= end {
            if let Some(v) = self.get_or_hold(t) {
                out.insert(t, v);
            }
            t += freq;
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: i64) -> Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn slice_is_half_open() {
        let mut s = TimeSeries::new();
        for h in 0..5 {
            s.insert(t(h), h as f64);
        }
        let slice = s.slice(t(1), t(4));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].1, 1.0);
        assert_eq!(slice[2].1, 3.0);
    }

    #[test]
    fn resample_forward_fills() {
        let mut s = TimeSeries::new();
        s.insert(t(0), 1.0);
        s.insert(t(2), 2.0);
        let r = s.resample(t(0), t(3), Duration::hours(1));
        assert_eq!(r.get(t(1)), Some(1.0));
        assert_eq!(r.get(t(2)), Some(2.0));
        assert_eq!(r.get(t(3)), Some(2.0));
    }

    #[test]
    fn mean_over_horizon() {
        let mut s = TimeSeries::new();
        for h in 0..4 {
            s.insert(t(h), (h + 1) as f64);
        }
        // values at h=0..3 are 1,2,3,4; mean of [1,4) -> (2+3)/2
        assert_eq!(s.mean(t(1), t(3)), Some(2.5));
    }
}

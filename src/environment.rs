//! Time-varying inputs: electricity prices, forecasts, temperatures, and
//! the workload request stream (spec.md §4.E).
//!
//! Per-location series are kept in an [`IndexMap`] rather than a
//! `HashMap` so that location iteration order matches first-insertion
//! order, which the scheduler's cost-key tie-breaking depends on
//! (spec.md §4.F.3: "Tie-breaking: stable by location insertion order").

use std::collections::HashMap;

use chrono::Duration;
use indexmap::IndexMap;

use crate::server::Location;
use crate::timeseries::{TimeSeries, Timestamp};
use crate::vm::{SlaThresholds, VirtualMachine, VmId};

#[derive(Debug, Clone)]
pub enum RequestKind {
    Boot(VirtualMachine),
    Delete(VmId),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub timestamp: Timestamp,
    pub kind: RequestKind,
}

impl Request {
    pub fn vm_id(&self) -> VmId {
        match &self.kind {
            RequestKind::Boot(vm) => vm.id,
            RequestKind::Delete(id) => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub period: Duration,
    /// Number of `period`-length steps the forecast horizon spans.
    pub forecast_periods: u32,
    el_prices: IndexMap<Location, TimeSeries>,
    forecast_el: IndexMap<Location, TimeSeries>,
    temperature: IndexMap<Location, TimeSeries>,
    requests: Vec<Request>,
    vm_sla_ths: HashMap<VmId, SlaThresholds>,
    default_sla_ths: SlaThresholds,
    current_time: Timestamp,
}

impl Environment {
    pub fn new(start: Timestamp, end: Timestamp, period: Duration, forecast_periods: u32) -> Self {
        Self {
            start,
            end,
            period,
            forecast_periods,
            el_prices: IndexMap::new(),
            forecast_el: IndexMap::new(),
            temperature: IndexMap::new(),
            requests: Vec::new(),
            vm_sla_ths: HashMap::new(),
            default_sla_ths: SlaThresholds::new(300.0, 900.0, 1800.0),
            current_time: start,
        }
    }

    pub fn set_default_sla_thresholds(&mut self, thresholds: SlaThresholds) {
        self.default_sla_ths = thresholds;
    }

    pub fn register_location(&mut self, loc: Location, prices: TimeSeries, forecast: TimeSeries, temperature: TimeSeries) {
        self.el_prices.insert(loc.clone(), prices);
        self.forecast_el.insert(loc.clone(), forecast);
        self.temperature.insert(loc, temperature);
    }

    pub fn push_request(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub fn register_sla_thresholds(&mut self, vm: VmId, thresholds: SlaThresholds) {
        self.vm_sla_ths.insert(vm, thresholds);
    }

    /// Per-VM ordered downtime-tolerance thresholds, falling back to the
    /// environment's default tiers for VMs that were never registered
    /// explicitly.
    pub fn vm_sla_thresholds(&self, vm: VmId) -> SlaThresholds {
        self.vm_sla_ths.get(&vm).copied().unwrap_or(self.default_sla_ths)
    }

    /// Locations in first-insertion order, for stable cost-key tie-breaks.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.el_prices.keys()
    }

    pub fn price_series(&self, loc: &Location) -> Option<&TimeSeries> {
        self.el_prices.get(loc)
    }

    pub fn forecast_series(&self, loc: &Location) -> Option<&TimeSeries> {
        self.forecast_el.get(loc)
    }

    pub fn temperature_series(&self, loc: &Location) -> Option<&TimeSeries> {
        self.temperature.get(loc)
    }

    pub fn price_at(&self, loc: &Location, t: Timestamp) -> Option<f64> {
        self.price_series(loc).and_then(|s| s.get_or_hold(t))
    }

    pub fn temperature_at(&self, loc: &Location, t: Timestamp) -> Option<f64> {
        self.temperature_series(loc).and_then(|s| s.get_or_hold(t))
    }

    /// All tick boundaries in `[start, end]`, stepping by `period`. The
    /// simulator drives `set_time` across this sequence; `get_time` then
    /// reflects the environment's current tick for the rest of this call.
    pub fn itertimes(&self) -> Vec<Timestamp> {
        let mut times = Vec::new();
        let mut t = self.start;
        while t <= self.end {
            times.push(t);
            t += self.period;
        }
        times
    }

    pub fn set_time(&mut self, t: Timestamp) {
        self.current_time = t;
    }

    pub fn get_time(&self) -> Timestamp {
        self.current_time
    }

    pub fn get_period(&self) -> Duration {
        self.period
    }

    pub fn forecast_end(&self) -> Timestamp {
        self.current_time + self.period * self.forecast_periods as i32
    }

    /// Requests whose timestamp lies in `[t, t+period)`.
    pub fn get_requests(&self) -> Vec<&Request> {
        let t = self.current_time;
        let next = t + self.period;
        self.requests.iter().filter(|r| r.timestamp >= t && r.timestamp < next).collect()
    }

    pub fn get_remaining_duration(&self, vm: &VirtualMachine, t: Timestamp) -> Duration {
        vm.remaining_duration(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceVector;
    use chrono::TimeZone;

    fn ts(h: i64) -> Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + Duration::hours(h)
    }
    use chrono::Utc;

    #[test]
    fn itertimes_covers_inclusive_range() {
        let env = Environment::new(ts(0), ts(3), Duration::hours(1), 4);
        let times = env.itertimes();
        assert_eq!(times, vec![ts(0), ts(1), ts(2), ts(3)]);
    }

    #[test]
    fn get_requests_is_half_open_on_current_window() {
        let mut env = Environment::new(ts(0), ts(5), Duration::hours(1), 4);
        let vm = VirtualMachine::new(VmId(1), ResourceVector::new(4.0, 2.0), ts(0), ts(5));
        env.push_request(Request { timestamp: ts(0), kind: RequestKind::Boot(vm) });
        env.push_request(Request { timestamp: ts(1), kind: RequestKind::Delete(VmId(2)) });
        env.set_time(ts(0));
        assert_eq!(env.get_requests().len(), 1);
    }

    #[test]
    fn locations_preserve_insertion_order() {
        let mut env = Environment::new(ts(0), ts(1), Duration::hours(1), 1);
        env.register_location(Location::new("B"), TimeSeries::new(), TimeSeries::new(), TimeSeries::new());
        env.register_location(Location::new("A"), TimeSeries::new(), TimeSeries::new(), TimeSeries::new());
        let order: Vec<_> = env.locations().map(|l| l.0.clone()).collect();
        assert_eq!(order, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn forecast_end_uses_forecast_periods() {
        let mut env = Environment::new(ts(0), ts(10), Duration::hours(1), 3);
        env.set_time(ts(2));
        assert_eq!(env.forecast_end(), ts(5));
    }

    #[test]
    fn unregistered_vm_falls_back_to_default_sla_thresholds() {
        let env = Environment::new(ts(0), ts(1), Duration::hours(1), 1);
        let th = env.vm_sla_thresholds(VmId(42));
        assert_eq!(th.tiers, [300.0, 900.0, 1800.0]);
    }
}

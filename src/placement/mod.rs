//! VM placement strategies (spec.md §4.F.2, §4.F.3).
//!
//! One file per strategy, mirroring how the teacher lays out its
//! `vm_placement_algorithms/` directory: a shared trait here, concrete
//! strategies in their own modules.

mod best_fit;
mod cheapest;
mod random_fit;

pub use best_fit::BestFitDecreasing;
pub use cheapest::CheapestHost;
pub use random_fit::RandomFit;

use crate::cloud::Cloud;
use crate::environment::Environment;
use crate::server::{Location, ServerId};
use crate::vm::VirtualMachine;

/// Selects a host for a VM given the current cloud state and environment.
/// `exclude_loc` is set when placement is being (re)considered for a VM
/// that is already running somewhere -- candidates at its current
/// location are skipped, since staying put isn't a migration decision.
pub trait PlacementStrategy {
    fn select_host(
        &self,
        vm: &VirtualMachine,
        cloud: &Cloud,
        env: &Environment,
        exclude_loc: Option<&Location>,
    ) -> Option<ServerId>;
}

/// Scans `loc`'s servers in stable (construction) order and returns the
/// first whose spare capacity fits `vm`'s demand (spec.md §4.F.2).
fn first_fit_in_location(vm: &VirtualMachine, loc: &Location, cloud: &Cloud) -> Option<ServerId> {
    let state = cloud.get_current();
    cloud
        .servers()
        .iter()
        .filter(|s| s.loc == *loc)
        .find(|s| {
            let used = state.capacity_used(s.id, cloud.registry());
            used.add(vm.demand).fits_within(s.capacity)
        })
        .map(|s| s.id)
}

/// Mean of `series` over `horizon` ticks of `period`, starting at
/// `t + period` (spec.md §4.F.3). With `weighted = true`, earlier ticks
/// are weighted more heavily, decreasing linearly to `1`.
pub(crate) fn forecast_mean(
    env: &Environment,
    loc: &Location,
    ideal: bool,
    weighted: bool,
    horizon: u32,
) -> Option<f64> {
    let series = if ideal { env.price_series(loc) } else { env.forecast_series(loc) };
    let series = series?;
    let t = env.get_time();
    let period = env.get_period();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for step in 0..horizon {
        let at = t + period + period * step as i32;
        let value = series.get_or_hold(at)?;
        let w = if weighted { (horizon - step) as f64 } else { 1.0 };
        weighted_sum += w * value;
        weight_total += w;
    }
    if weight_total <= 0.0 {
        None
    } else {
        Some(weighted_sum / weight_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceVector;
    use crate::server::Server;
    use crate::timeseries::TimeSeries;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(h: i64) -> crate::timeseries::Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn forecast_mean_is_plain_average_when_unweighted() {
        let mut env = Environment::new(ts(0), ts(10), Duration::hours(1), 4);
        let mut series = TimeSeries::new();
        for h in 1..=4 {
            series.insert(ts(h), h as f64);
        }
        env.register_location(Location::new("A"), TimeSeries::new(), series, TimeSeries::new());
        env.set_time(ts(0));
        let mean = forecast_mean(&env, &Location::new("A"), false, false, 4).unwrap();
        assert!((mean - 2.5).abs() < 1e-9);
    }

    #[test]
    fn first_fit_in_location_respects_capacity() {
        let server = Server::new(crate::server::ServerId(1), ResourceVector::new(4.0, 2.0), Location::new("A"));
        let cloud = Cloud::new(vec![server]);
        let vm = VirtualMachine::new(crate::vm::VmId(1), ResourceVector::new(8.0, 1.0), ts(0), ts(1));
        assert_eq!(first_fit_in_location(&vm, &Location::new("A"), &cloud), None);
    }
}

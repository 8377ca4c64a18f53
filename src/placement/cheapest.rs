//! Scenarios 2, 3 and 6: rank locations by the cost key and place on the
//! first fitting server at the cheapest one (spec.md §4.F.2, §4.F.3).

use super::{first_fit_in_location, forecast_mean, PlacementStrategy};
use crate::cloud::Cloud;
use crate::config::SimulationConfig;
use crate::environment::Environment;
use crate::server::{Location, ServerId};
use crate::vm::VirtualMachine;

/// `forecast = false` ranks by the current spot price (`_find_cheapest_host`,
/// scenario 2); `forecast = true` ranks by the mean forecast price over
/// `max_fc_horizon` steps (scenario 3), or, with `ideal = true`, by the
/// mean of the *actual* future prices, simulating a perfect forecast
/// (scenario 6).
pub struct CheapestHost {
    forecast: bool,
    ideal: bool,
    weighted: bool,
    horizon: u32,
}

impl CheapestHost {
    pub fn now() -> Self {
        Self {
            forecast: false,
            ideal: false,
            weighted: false,
            horizon: 0,
        }
    }

    pub fn forecast(config: &SimulationConfig) -> Self {
        Self {
            forecast: true,
            ideal: false,
            weighted: false,
            horizon: config.max_fc_horizon,
        }
    }

    pub fn forecast_ideal(config: &SimulationConfig) -> Self {
        Self {
            forecast: true,
            ideal: true,
            weighted: false,
            horizon: config.max_fc_horizon,
        }
    }

    pub fn weighted(mut self) -> Self {
        self.weighted = true;
        self
    }

    /// The cost key used to rank `loc`; `None` if no price data is
    /// available there (such locations sort last).
    fn cost_key(&self, env: &Environment, loc: &Location) -> Option<f64> {
        if !self.forecast {
            env.price_at(loc, env.get_time())
        } else {
            forecast_mean(env, loc, self.ideal, self.weighted, self.horizon)
        }
    }
}

impl PlacementStrategy for CheapestHost {
    fn select_host(
        &self,
        vm: &VirtualMachine,
        cloud: &Cloud,
        env: &Environment,
        exclude_loc: Option<&Location>,
    ) -> Option<ServerId> {
        // Stable by insertion order (spec.md §4.F.3): `sort_by` is a
        // stable sort, and locations are iterated in insertion order.
        let mut ranked: Vec<&Location> = env.locations().filter(|l| Some(*l) != exclude_loc).collect();
        ranked.sort_by(|a, b| {
            let ka = self.cost_key(env, a).unwrap_or(f64::INFINITY);
            let kb = self.cost_key(env, b).unwrap_or(f64::INFINITY);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.into_iter().find_map(|loc| first_fit_in_location(vm, loc, cloud))
    }
}

//! Multi-criterion migration selection (spec.md §4.F.4).
//!
//! Mirrors the teacher's pattern of a small trait with interchangeable
//! implementations (see `placement`): [`MigrationStrategy`] here plays the
//! role `PlacementStrategy` plays there.

use std::collections::HashMap;

use chrono::Duration;

use super::physics::{self, bandwidth_for};
use crate::cloud::Cloud;
use crate::config::SimulationConfig;
use crate::environment::Environment;
use crate::server::Location;
use crate::timeseries::Timestamp;
use crate::vm::VmId;

pub trait MigrationStrategy {
    /// Candidates worth migrating this tick, as `(vm, destination)` pairs
    /// sorted by descending utility, already filtered against
    /// `config.utility_threshold`.
    fn select_migrations(&self, cloud: &Cloud, env: &Environment, config: &SimulationConfig) -> Vec<(VmId, Location)>;
}

/// Scenarios 1-3: no migration selection at all.
pub struct NoMigration;

impl MigrationStrategy for NoMigration {
    fn select_migrations(&self, _cloud: &Cloud, _env: &Environment, _config: &SimulationConfig) -> Vec<(VmId, Location)> {
        Vec::new()
    }
}

/// Scenarios 4-6: rank every still-running VM's best destination by the
/// weighted utility function and keep candidates above threshold.
pub struct UtilityMigration {
    forecast: bool,
    ideal: bool,
}

impl UtilityMigration {
    pub fn current_prices() -> Self {
        Self { forecast: false, ideal: false }
    }

    pub fn forecast() -> Self {
        Self { forecast: true, ideal: false }
    }

    pub fn ideal_forecast() -> Self {
        Self { forecast: true, ideal: true }
    }

    fn price_series<'a>(&self, env: &'a Environment, loc: &Location) -> Option<&'a crate::timeseries::TimeSeries> {
        if self.ideal {
            env.price_series(loc)
        } else {
            env.forecast_series(loc)
        }
    }

    fn mean_error(&self, env: &Environment, a: &Location, b: &Location, t_next: Timestamp, period: Duration, horizon: u32) -> Option<f64> {
        let sa = self.price_series(env, a)?;
        let sb = self.price_series(env, b)?;
        let mut sum = 0.0;
        for step in 0..=horizon {
            let t = t_next + period * step as i32;
            sum += sa.get_or_hold(t)? - sb.get_or_hold(t)?;
        }
        Some(sum)
    }
}

/// `(vm.downtime + predicted_downtime) / sla_threshold[vm.penalties]`,
/// clipped to 1; always 1 once `penalties >= 3` (spec.md §4.F.4 `p_sla`).
fn p_sla(env: &Environment, vm: &crate::vm::VirtualMachine, bandwidth: f64) -> f64 {
    if vm.penalties >= 3 {
        return 1.0;
    }
    let predicted = physics::predicted_downtime(vm, bandwidth);
    let total = vm.downtime + predicted;
    match env.vm_sla_thresholds(vm.id).threshold_for(vm.penalties) {
        Some(th) if th > 0.0 => (total / th).min(1.0),
        _ => 1.0,
    }
}

impl MigrationStrategy for UtilityMigration {
    fn select_migrations(&self, cloud: &Cloud, env: &Environment, config: &SimulationConfig) -> Vec<(VmId, Location)> {
        let state = cloud.get_current();
        let registry = cloud.registry();
        let t_next = env.get_time() + env.get_period();
        let period = env.get_period();
        let locations: Vec<Location> = env.locations().cloned().collect();

        struct Candidate {
            vm: VmId,
            current_loc: Location,
            remaining_hours: i64,
        }

        let mut candidates = Vec::new();
        for vm in registry.iter() {
            if !state.is_allocated(vm.id) {
                continue;
            }
            let remaining = env.get_remaining_duration(vm, t_next);
            let remaining_hours = remaining.num_seconds() / 3600;
            if remaining_hours <= 0 {
                continue;
            }
            let server = state.allocation(vm.id).unwrap();
            let current_loc = state.server(server).unwrap().loc.clone();
            candidates.push(Candidate {
                vm: vm.id,
                current_loc,
                remaining_hours,
            });
        }
        if candidates.is_empty() {
            return Vec::new();
        }

        let max_remaining_hours = candidates.iter().map(|c| c.remaining_hours).max().unwrap_or(1).max(1);

        // Raw criteria per (vm, destination), plus the pools needed for
        // the two normalization passes (global mean-error min/max, and
        // per-location maxima for energy and cost benefit).
        let mut sla_raw: HashMap<(VmId, Location), f64> = HashMap::new();
        let mut energy_raw: HashMap<(VmId, Location), f64> = HashMap::new();
        let mut cost_benefit_raw: HashMap<(VmId, Location), f64> = HashMap::new();

        let mut min_me = f64::INFINITY;
        let mut max_me = f64::NEG_INFINITY;

        for c in &candidates {
            // Scenarios 4/6 compare only the immediate next period
            // (`min_h = max_h = 0` in the Python original); scenario 5's
            // full forecast scenario looks `max_fc_horizon - 1` steps
            // ahead.
            let max_fc = if self.forecast {
                c.remaining_hours.min(config.max_fc_horizon as i64 - 1).max(0) as u32
            } else {
                0
            };
            for loc in &locations {
                if *loc == c.current_loc {
                    continue;
                }
                let bandwidth = bandwidth_for(loc, &config.bandwidth_map, config.fixed_bandwidth);
                let vm = registry.get(c.vm).unwrap();
                sla_raw.insert((c.vm, loc.clone()), p_sla(env, vm, bandwidth));
                energy_raw.insert((c.vm, loc.clone()), physics::migration_energy(vm, bandwidth));
                if let Some(me) = self.mean_error(env, &c.current_loc, loc, t_next, period, max_fc) {
                    cost_benefit_raw.insert((c.vm, loc.clone()), me);
                    min_me = min_me.min(me);
                    max_me = max_me.max(me);
                }
            }
        }

        let normalize_me = |me: f64| -> f64 {
            if (max_me - min_me).abs() < 1e-12 {
                0.0
            } else {
                (me - min_me) / (max_me - min_me)
            }
        };

        let mut max_energy_per_loc: HashMap<Location, f64> = HashMap::new();
        let mut max_cost_benefit_per_loc: HashMap<Location, f64> = HashMap::new();
        for loc in &locations {
            let e_max = candidates
                .iter()
                .filter(|c| c.current_loc != *loc)
                .filter_map(|c| energy_raw.get(&(c.vm, loc.clone())))
                .cloned()
                .fold(0.0_f64, f64::max);
            max_energy_per_loc.insert(loc.clone(), e_max);

            let cb_max = candidates
                .iter()
                .filter(|c| c.current_loc != *loc)
                .filter_map(|c| cost_benefit_raw.get(&(c.vm, loc.clone())).map(|v| normalize_me(*v)))
                .fold(0.0_f64, f64::max);
            max_cost_benefit_per_loc.insert(loc.clone(), cb_max);
        }

        let dc_load = state.calculate_utilisations_per_location(registry, &config.custom_weights.unwrap_or_default());
        let max_util = dc_load.values().cloned().fold(0.0_f64, f64::max);

        let mut best: Vec<(VmId, Location, f64)> = Vec::new();
        for c in &candidates {
            let current_util = dc_load.get(&c.current_loc).copied().unwrap_or(0.0);
            let p_dc = if max_util > 0.0 { current_util / max_util } else { 0.0 };
            let p_rem = c.remaining_hours as f64 / max_remaining_hours as f64;

            let mut best_for_vm: Option<(Location, f64)> = None;
            for loc in &locations {
                if *loc == c.current_loc {
                    continue;
                }
                let key = (c.vm, loc.clone());
                let sla = match sla_raw.get(&key) {
                    Some(v) => *v,
                    None => continue,
                };
                let e_max = max_energy_per_loc.get(loc).copied().unwrap_or(0.0);
                let p_en = if e_max > 0.0 {
                    physics::joule_to_kwh(energy_raw[&key] / e_max)
                } else {
                    0.0
                };
                let cb_max = max_cost_benefit_per_loc.get(loc).copied().unwrap_or(0.0);
                let p_cs = match cost_benefit_raw.get(&key) {
                    Some(raw) if cb_max > 0.0 => normalize_me(*raw) / cb_max,
                    _ => 0.0,
                };

                let u = config.w_sla * sla
                    + config.w_energy * p_en
                    + config.w_vm_rem * p_rem
                    + config.w_dcload * p_dc
                    + config.w_cost * p_cs;

                if best_for_vm.as_ref().map(|(_, best_u)| u > *best_u).unwrap_or(true) {
                    best_for_vm = Some((loc.clone(), u));
                }
            }

            if let Some((loc, u)) = best_for_vm {
                best.push((c.vm, loc, u));
            }
        }

        best.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        best.into_iter()
            .filter(|(_, _, u)| *u > config.utility_threshold)
            .map(|(vm, loc, _)| (vm, loc))
            .collect()
    }
}

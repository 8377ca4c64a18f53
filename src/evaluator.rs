//! Replays a [`Schedule`] against a [`Cloud`] to compute utilisation,
//! synthetic power, cooling overhead, migration overhead, and the
//! aggregate cost/penalty signals (spec.md §4.G).
//!
//! Every function here takes the cloud, environment and schedule by
//! reference and leaves the cloud reset to `_real` when it returns,
//! mirroring the Python original's `cloud.reset_to_initial()` /
//! `cloud.reset_to_real()` bracket around each pass (see
//! `original_source/philharmonic/scheduler/evaluator.py`).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::action::Action;
use crate::cloud::Cloud;
use crate::environment::Environment;
use crate::migration::physics::{self, bandwidth_for};
use crate::resource::ResourceWeights;
use crate::schedule::Schedule;
use crate::server::{Location, ServerId};
use crate::timeseries::Timestamp;
use crate::vm::VmId;

/// Idle-host power draw in watts (spec.md §4.G).
pub const P_IDLE_W: f64 = 100.0;
/// Fully-utilised host power draw in watts.
pub const P_PEAK_W: f64 = 200.0;
/// Standard deviation of the Gaussian noise added to each power sample.
pub const POWER_NOISE_STD_W: f64 = 5.0;
/// Power/cost sampling cadence.
pub const POWER_SAMPLE_PERIOD: Duration = Duration::minutes(5);
/// Weight of the capacity-violation term in the constraint penalty.
pub const CAP_PENALTY_WEIGHT: f64 = 0.6;
/// Weight of the unscheduled-VM term in the constraint penalty.
pub const SCHED_PENALTY_WEIGHT: f64 = 0.4;

/// Partial Power-Usage-Effectiveness multiplier derived from ambient
/// temperature (GLOSSARY "pPUE"). spec.md §4.G calls cooling "an
/// externally supplied function"; `original_source`'s own
/// `calculate_pue` lives in a `calculator.py` that was filtered out of
/// the retrieval pack (not code/build-config), so this crate ships one
/// concrete model behind a trait rather than guessing at the filtered
/// implementation, and documents the choice in DESIGN.md.
pub trait CoolingModel {
    fn ppue(&self, ambient_celsius: f64) -> f64;
}

/// Flat `1.0` (no cooling overhead) below a free-air-cooling limit,
/// rising linearly above it -- the shape used throughout the
/// data-center PUE literature for air-cooled facilities.
#[derive(Debug, Clone, Copy)]
pub struct LinearCoolingModel {
    pub free_cooling_limit_c: f64,
    pub slope_per_degree: f64,
}

impl Default for LinearCoolingModel {
    fn default() -> Self {
        Self {
            free_cooling_limit_c: 20.0,
            slope_per_degree: 0.02,
        }
    }
}

impl CoolingModel for LinearCoolingModel {
    fn ppue(&self, ambient_celsius: f64) -> f64 {
        let over = (ambient_celsius - self.free_cooling_limit_c).max(0.0);
        1.0 + over * self.slope_per_degree
    }
}

/// No cooling overhead at any temperature; used where temperature data
/// isn't available, and by tests that want a power number with only the
/// idle/peak/utilisation terms in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCooling;

impl CoolingModel for NoCooling {
    fn ppue(&self, _ambient_celsius: f64) -> f64 {
        1.0
    }
}

/// Stepwise-constant per-server utilisation, sampled at every action
/// timestamp within the window plus its start and end, extended to the
/// window's end by holding the last value (spec.md §4.G).
#[derive(Debug, Clone)]
pub struct UtilisationSeries {
    pub times: Vec<Timestamp>,
    pub per_server: HashMap<ServerId, Vec<f64>>,
}

impl UtilisationSeries {
    fn value_at(&self, server: ServerId, t: Timestamp) -> f64 {
        let values = match self.per_server.get(&server) {
            Some(v) => v,
            None => return 0.0,
        };
        hold_at(&self.times, values, t)
    }
}

/// Value of a stepwise-constant series at `t`: the last sample at or
/// before `t`, or the first sample if `t` precedes every sample.
fn hold_at(times: &[Timestamp], values: &[f64], t: Timestamp) -> f64 {
    match times.partition_point(|&ts| ts <= t) {
        0 => values[0],
        n => values[n - 1],
    }
}

/// Actions in `[start, end]` grouped by timestamp, preserving schedule
/// order within and across groups (the `Schedule` is already sorted so
/// equal timestamps land contiguously).
fn grouped_actions(schedule: &Schedule, start: Timestamp, end: Timestamp) -> Vec<(Timestamp, Vec<&Action>)> {
    let mut grouped: Vec<(Timestamp, Vec<&Action>)> = Vec::new();
    for (t, action) in schedule.iter() {
        if *t < start || *t > end {
            continue;
        }
        match grouped.last_mut() {
            Some((last_t, actions)) if *last_t == *t => actions.push(action),
            _ => grouped.push((*t, vec![action])),
        }
    }
    grouped
}

/// Replays `schedule` against `cloud` and records per-server utilisation
/// at every action timestamp in `[start, end]` (spec.md §4.G
/// "Utilisation series"). `windowed = false` resets to `_initial` first
/// (the whole-run replay); `windowed = true` resets to `_real` (a replay
/// of just `[start, end)` against the state as of `start`).
pub fn calculate_cloud_utilisation(
    cloud: &mut Cloud,
    schedule: &Schedule,
    weights: &ResourceWeights,
    start: Timestamp,
    end: Timestamp,
    windowed: bool,
) -> UtilisationSeries {
    if windowed {
        cloud.reset_to_real();
    } else {
        cloud.reset_to_initial();
    }

    let mut times = vec![start];
    let mut snapshots = vec![cloud.get_current().calculate_utilisations(cloud.registry(), weights)];

    for (t, actions) in grouped_actions(schedule, start, end) {
        if t == start {
            times.clear();
            snapshots.clear();
        }
        for action in actions {
            let _ = cloud.apply(action);
        }
        times.push(t);
        snapshots.push(cloud.get_current().calculate_utilisations(cloud.registry(), weights));
    }

    if *times.last().unwrap() < end {
        times.push(end);
        snapshots.push(snapshots.last().unwrap().clone());
    }

    let mut per_server: HashMap<ServerId, Vec<f64>> = HashMap::new();
    for server in cloud.servers() {
        per_server.insert(
            server.id,
            snapshots.iter().map(|snap| snap.get(&server.id).copied().unwrap_or(0.0)).collect(),
        );
    }

    cloud.reset_to_real();
    UtilisationSeries { times, per_server }
}

/// All sample instants on the power/cost grid spanning `util`'s range.
fn sample_grid(util: &UtilisationSeries) -> Vec<Timestamp> {
    let start = *util.times.first().unwrap();
    let end = *util.times.last().unwrap();
    let mut out = Vec::new();
    let mut t = start;
    while t <= end {
        out.push(t);
        t += POWER_SAMPLE_PERIOD;
    }
    out
}

/// One sampled instant's per-server power draw, in watts.
#[derive(Debug, Clone)]
pub struct PowerSample {
    pub time: Timestamp,
    pub power_w: HashMap<ServerId, f64>,
}

/// Synthetic power signal `P(t) = (P_peak - P_idle) * u(t) + noise`,
/// sampled every [`POWER_SAMPLE_PERIOD`]. A server at `u = 0` is treated
/// as suspended and draws no power at all (spec.md §4.G).
pub fn generate_power_series(util: &UtilisationSeries, rng: &mut StdRng, noise_std: f64) -> Vec<PowerSample> {
    let normal = Normal::new(0.0, noise_std.max(0.0)).expect("noise_std must be finite and non-negative");
    sample_grid(util)
        .into_iter()
        .map(|t| {
            let power_w = util
                .per_server
                .keys()
                .map(|&server| {
                    let u = util.value_at(server, t);
                    let power = if u <= 0.0 {
                        0.0
                    } else {
                        let base = P_IDLE_W + u * (P_PEAK_W - P_IDLE_W);
                        let noise = if noise_std > 0.0 { normal.sample(rng) } else { 0.0 };
                        (base + noise).max(0.0)
                    };
                    (server, power)
                })
                .collect();
            PowerSample { time: t, power_w }
        })
        .collect()
}

/// Multiplies each server's power sample by the pPUE derived from its
/// location's ambient temperature at the sample time (spec.md §4.G
/// "Cooling overhead"). Samples at a location with no temperature data
/// are left unscaled.
pub fn apply_cooling_overhead(samples: &mut [PowerSample], cloud: &Cloud, env: &Environment, cooling: &dyn CoolingModel) {
    let locations: HashMap<ServerId, Location> = cloud.servers().iter().map(|s| (s.id, s.loc.clone())).collect();
    for sample in samples.iter_mut() {
        for (server, power) in sample.power_w.iter_mut() {
            let Some(loc) = locations.get(server) else { continue };
            if let Some(temp) = env.temperature_at(loc, sample.time) {
                *power *= cooling.ppue(temp);
            }
        }
    }
}

/// Integrates power samples against each server's location electricity
/// price, returning `(energy_kwh, cost_dollars)` (spec.md §4.G
/// "Electricity cost"). Samples at a location with no price data
/// contribute energy but no cost.
pub fn electricity_cost(samples: &[PowerSample], cloud: &Cloud, env: &Environment) -> (f64, f64) {
    let locations: HashMap<ServerId, Location> = cloud.servers().iter().map(|s| (s.id, s.loc.clone())).collect();
    let dt_hours = POWER_SAMPLE_PERIOD.num_seconds() as f64 / 3600.0;
    let mut energy_kwh = 0.0;
    let mut cost = 0.0;
    for sample in samples {
        for (server, power_w) in &sample.power_w {
            let kwh = power_w / 1000.0 * dt_hours;
            energy_kwh += kwh;
            if let Some(loc) = locations.get(server) {
                if let Some(price) = env.price_at(loc, sample.time) {
                    cost += kwh * price;
                }
            }
        }
    }
    (energy_kwh, cost)
}

/// For every committed `Migrate` with distinct before/after hosts in
/// `[start, end]`, computes `E_mig` (spec.md §4.F.5), converts it to
/// kWh, and charges it at the mean of the source and destination
/// electricity prices at the action's timestamp. Returns
/// `(energy_kwh, cost_dollars)` (spec.md §4.G "Migration overhead").
pub fn migration_overhead(
    cloud: &mut Cloud,
    schedule: &Schedule,
    env: &Environment,
    bandwidth_map: &HashMap<Location, f64>,
    fixed_bandwidth: f64,
    start: Timestamp,
    end: Timestamp,
    windowed: bool,
) -> (f64, f64) {
    if windowed {
        cloud.reset_to_real();
    } else {
        cloud.reset_to_initial();
    }

    let mut total_energy = 0.0;
    let mut total_cost = 0.0;
    for (t, action) in grouped_actions(schedule, start, end).into_iter().flat_map(|(t, acts)| acts.into_iter().map(move |a| (t, a))) {
        if let Action::Migrate(vm_id, server_id) = action {
            let host_before = cloud.get_current().allocation(*vm_id);
            let _ = cloud.apply(action);
            if let Some(host_before) = host_before {
                if host_before != *server_id {
                    let loc_before = cloud.get_current().server(host_before).map(|s| s.loc.clone());
                    let loc_after = cloud.get_current().server(*server_id).map(|s| s.loc.clone());
                    if let (Some(loc_before), Some(loc_after)) = (loc_before, loc_after) {
                        let bandwidth = bandwidth_for(&loc_after, bandwidth_map, fixed_bandwidth);
                        if let Some(vm) = cloud.registry().get(*vm_id) {
                            let kwh = physics::joule_to_kwh(physics::migration_energy(vm, bandwidth));
                            let price_before = env.price_at(&loc_before, t).unwrap_or(0.0);
                            let price_after = env.price_at(&loc_after, t).unwrap_or(0.0);
                            total_energy += kwh;
                            total_cost += kwh * (price_before + price_after) / 2.0;
                        }
                    }
                }
            }
        } else {
            let _ = cloud.apply(action);
        }
    }

    cloud.reset_to_real();
    (total_energy, total_cost)
}

fn time_weighted_mean(times: &[Timestamp], values: &[f64]) -> f64 {
    if times.len() < 2 {
        return values.first().copied().unwrap_or(0.0);
    }
    let mut weight = 0.0;
    let mut total = 0.0;
    for i in 0..times.len() - 1 {
        let dt = (times[i + 1] - times[i]).num_seconds() as f64;
        weight += dt;
        total += values[i] * dt;
    }
    if weight <= 0.0 {
        values[0]
    } else {
        total / weight
    }
}

/// Weighted mean over ticks of `0.6*(1 - ratio_within_capacity) +
/// 0.4*(1 - ratio_allocated)` (spec.md §4.G "Constraint penalty"),
/// weighted by how long each value held.
pub fn constraint_penalty(cloud: &mut Cloud, schedule: &Schedule, start: Timestamp, end: Timestamp, windowed: bool) -> f64 {
    if windowed {
        cloud.reset_to_real();
    } else {
        cloud.reset_to_initial();
    }

    let penalty_of = |cloud: &Cloud| {
        let state = cloud.get_current();
        CAP_PENALTY_WEIGHT * (1.0 - state.ratio_within_capacity(cloud.registry())) + SCHED_PENALTY_WEIGHT * (1.0 - state.ratio_allocated())
    };

    let mut times = vec![start];
    let mut values = vec![penalty_of(cloud)];
    for (t, actions) in grouped_actions(schedule, start, end) {
        if t == start {
            times.clear();
            values.clear();
        }
        for action in actions {
            let _ = cloud.apply(action);
        }
        times.push(t);
        values.push(penalty_of(cloud));
    }
    if *times.last().unwrap() < end {
        times.push(end);
        values.push(*values.last().unwrap());
    }

    cloud.reset_to_real();
    time_weighted_mean(&times, &values)
}

/// `1` migration per VM over the window: `0.0`; more, closer to `1.0`
/// (spec.md §4.G "SLA penalty"). Migrations are counted per committed
/// action, not deduplicated per VM (DESIGN.md's resolution of spec.md
/// §9's first Open Question).
pub fn sla_penalty(cloud: &mut Cloud, schedule: &Schedule, start: Timestamp, end: Timestamp, windowed: bool) -> f64 {
    if windowed {
        cloud.reset_to_real();
    } else {
        cloud.reset_to_initial();
    }

    let known_vms: HashSet<VmId> = cloud.get_current().known_vms.clone();
    let mut counts: HashMap<VmId, u32> = known_vms.into_iter().map(|vm| (vm, 0)).collect();
    for (t, action) in schedule.iter() {
        if *t < start || *t > end {
            continue;
        }
        if let Action::Migrate(vm, _) = action {
            *counts.entry(*vm).or_insert(0) += 1;
        }
    }

    cloud.reset_to_real();

    if counts.is_empty() {
        return 0.0;
    }
    let duration_hours = (end - start).num_seconds() as f64 / 3600.0;
    if duration_hours <= 0.0 {
        return 0.0;
    }
    let mean = counts
        .values()
        .map(|&c| {
            let rate_per_4h = 4.0 * c as f64 / duration_hours;
            ((rate_per_4h - 1.0) / 3.0).clamp(0.0, 1.0)
        })
        .sum::<f64>()
        / counts.len() as f64;
    mean
}

/// `(util_penalty, utilprice_penalty, constraint_penalty, sla_penalty)`,
/// each in `[0, 1]` (spec.md §4.G "Aggregate evaluate()", P7). `start`/
/// `end` default to the whole environment window, replaying from
/// `_initial`; an explicit window replays from `_real`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationResult {
    pub util_penalty: f64,
    pub utilprice_penalty: f64,
    pub constraint_penalty: f64,
    pub sla_penalty: f64,
}

/// `(IT_energy_kWh, IT_cost_$, total_energy_kWh, total_cost_$)`
/// (spec.md §6 "Outputs"). `IT` is electricity for running VMs;
/// `total` additionally includes migration overhead. This is spec.md
/// §6's "serialized results record" -- `Serialize` lets a caller hand it
/// to `serde_json` the way the teacher's experiment runner serializes
/// its own results.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SimulationResult {
    pub it_energy_kwh: f64,
    pub it_cost: f64,
    pub total_energy_kwh: f64,
    pub total_cost: f64,
}

struct CachedRun {
    util: UtilisationSeries,
    power: Vec<PowerSample>,
}

/// Owns the weighting, cooling model and RNG used across a simulation's
/// evaluation calls, plus a cache of derived series keyed by the window
/// they were computed for -- spec.md §9's "explicit Evaluator object
/// owning a cache map keyed by `(start, end, temperature_version)`".
/// Temperature is fixed for the lifetime of one `Environment`, so this
/// crate keys on `(start, end)` alone.
pub struct Evaluator {
    weights: ResourceWeights,
    cooling: Box<dyn CoolingModel>,
    noise_std: f64,
    rng: RefCell<StdRng>,
    cache: RefCell<HashMap<(Timestamp, Timestamp), CachedRun>>,
}

impl Evaluator {
    pub fn new(weights: ResourceWeights, cooling: Box<dyn CoolingModel>, noise_std: f64, seed: u64) -> Self {
        Self {
            weights,
            cooling,
            noise_std,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// An evaluator with no power noise and no cooling overhead, for
    /// tests and other callers that want exactly reproducible numbers.
    pub fn deterministic(weights: ResourceWeights) -> Self {
        Self::new(weights, Box::new(NoCooling), 0.0, 0)
    }

    fn windowed_bounds(&self, env: &Environment, start: Option<Timestamp>, end: Option<Timestamp>) -> (Timestamp, Timestamp, bool) {
        match (start, end) {
            (None, None) => (env.start, env.end, false),
            (s, e) => (s.unwrap_or(env.start), e.unwrap_or(env.end), true),
        }
    }

    fn run(&self, cloud: &mut Cloud, env: &Environment, schedule: &Schedule, start: Timestamp, end: Timestamp, windowed: bool) -> UtilisationSeries {
        if let Some(cached) = self.cache.borrow().get(&(start, end)) {
            return cached.util.clone();
        }
        let util = calculate_cloud_utilisation(cloud, schedule, &self.weights, start, end, windowed);
        let power = generate_power_series(&util, &mut self.rng.borrow_mut(), self.noise_std);
        let mut power = power;
        apply_cooling_overhead(&mut power, cloud, env, self.cooling.as_ref());
        let result = util.clone();
        self.cache.borrow_mut().insert((start, end), CachedRun { util, power });
        result
    }

    /// Computes the four-signal evaluation (spec.md §4.G).
    pub fn evaluate(
        &self,
        cloud: &mut Cloud,
        env: &Environment,
        schedule: &Schedule,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> EvaluationResult {
        let (start, end, windowed) = self.windowed_bounds(env, start, end);
        self.run(cloud, env, schedule, start, end, windowed);

        let cache = self.cache.borrow();
        let cached = cache.get(&(start, end)).expect("just inserted by run()");

        let locations: HashMap<ServerId, Location> = cloud.servers().iter().map(|s| (s.id, s.loc.clone())).collect();

        let mut nonzero_sum = 0.0;
        let mut nonzero_count = 0u32;
        let mut priceutil_sum = 0.0;
        let mut price_sum = 0.0;
        let mut sample_count = 0u32;

        for sample in &cached.power {
            for &server in cached.util.per_server.keys() {
                let u = cached.util.value_at(server, sample.time);
                if u > 0.0 {
                    nonzero_sum += u;
                    nonzero_count += 1;
                }
                if let Some(loc) = locations.get(&server) {
                    if let Some(price) = env.price_at(loc, sample.time) {
                        priceutil_sum += price * u;
                        price_sum += price;
                        sample_count += 1;
                    }
                }
            }
        }

        let util_penalty = if nonzero_count > 0 { 1.0 - nonzero_sum / nonzero_count as f64 } else { 1.0 };
        let utilprice_penalty = if sample_count > 0 && price_sum > 0.0 {
            (priceutil_sum / sample_count as f64) / (price_sum / sample_count as f64)
        } else {
            0.0
        };
        drop(cache);

        let constraint_penalty = constraint_penalty(cloud, schedule, start, end, windowed);
        let sla_penalty = sla_penalty(cloud, schedule, start, end, windowed);

        EvaluationResult {
            util_penalty,
            utilprice_penalty: utilprice_penalty.clamp(0.0, 1.0),
            constraint_penalty,
            sla_penalty,
        }
    }

    /// `combined_cost / worst_case_cost`, where the worst case assumes
    /// full utilisation (`u == 1`) throughout the window, computed with
    /// noise disabled so the denominator is stable across calls
    /// (spec.md §4.G "Normalized combined cost").
    pub fn normalized_combined_cost(
        &self,
        cloud: &mut Cloud,
        env: &Environment,
        schedule: &Schedule,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> f64 {
        let (start, end, windowed) = self.windowed_bounds(env, start, end);
        let util = self.run(cloud, env, schedule, start, end, windowed);
        let mut power = generate_power_series(&util, &mut self.rng.borrow_mut(), self.noise_std);
        apply_cooling_overhead(&mut power, cloud, env, self.cooling.as_ref());
        let (_, actual_cost) = electricity_cost(&power, cloud, env);

        let worst_util = UtilisationSeries {
            times: util.times.clone(),
            per_server: util.per_server.keys().map(|&s| (s, vec![1.0; util.times.len()])).collect(),
        };
        let mut dummy_rng = StdRng::seed_from_u64(0);
        let mut worst_power = generate_power_series(&worst_util, &mut dummy_rng, 0.0);
        apply_cooling_overhead(&mut worst_power, cloud, env, self.cooling.as_ref());
        let (_, worst_cost) = electricity_cost(&worst_power, cloud, env);

        if worst_cost > 0.0 {
            actual_cost / worst_cost
        } else {
            0.0
        }
    }

    /// `(IT_energy_kWh, IT_cost_$, total_energy_kWh, total_cost_$)`
    /// (spec.md §6 "Outputs"): electricity for running VMs, plus
    /// migration overhead.
    pub fn simulation_result(
        &self,
        cloud: &mut Cloud,
        env: &Environment,
        schedule: &Schedule,
        bandwidth_map: &HashMap<Location, f64>,
        fixed_bandwidth: f64,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> SimulationResult {
        let (start, end, windowed) = self.windowed_bounds(env, start, end);
        let util = self.run(cloud, env, schedule, start, end, windowed);
        let mut power = generate_power_series(&util, &mut self.rng.borrow_mut(), self.noise_std);
        apply_cooling_overhead(&mut power, cloud, env, self.cooling.as_ref());
        let (it_energy_kwh, it_cost) = electricity_cost(&power, cloud, env);
        let (mig_energy_kwh, mig_cost) = migration_overhead(cloud, schedule, env, bandwidth_map, fixed_bandwidth, start, end, windowed);

        SimulationResult {
            it_energy_kwh,
            it_cost,
            total_energy_kwh: it_energy_kwh + mig_energy_kwh,
            total_cost: it_cost + mig_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceVector;
    use crate::server::{Location, Server};
    use crate::timeseries::TimeSeries;
    use crate::vm::VirtualMachine;
    use chrono::{TimeZone, Utc};

    fn ts(h: i64) -> Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + Duration::hours(h)
    }

    fn flat_series(hours: i64, value: f64) -> TimeSeries {
        let mut s = TimeSeries::new();
        for h in 0..=hours {
            s.insert(ts(h), value);
        }
        s
    }

    fn single_server_setup() -> (Cloud, Environment, Schedule) {
        let server = Server::new(crate::server::ServerId(1), ResourceVector::new(16.0, 8.0), Location::new("A"));
        let mut cloud = Cloud::new(vec![server]);
        let vm = VirtualMachine::new(crate::vm::VmId(1), ResourceVector::new(4.0, 2.0), ts(0), ts(5));
        cloud.apply_real(&Action::Boot(vm)).unwrap();
        cloud.apply_real(&Action::Migrate(crate::vm::VmId(1), crate::server::ServerId(1))).unwrap();
        cloud.apply_real(&Action::Delete(crate::vm::VmId(1))).unwrap();
        cloud.reset_to_real();

        let mut env = Environment::new(ts(0), ts(5), Duration::hours(1), 4);
        env.register_location(Location::new("A"), flat_series(24, 0.10), flat_series(24, 0.10), flat_series(24, 20.0));

        let mut schedule = Schedule::new();
        schedule.add(ts(0), Action::Migrate(crate::vm::VmId(1), crate::server::ServerId(1)));
        schedule.add(ts(5), Action::Delete(crate::vm::VmId(1)));

        // cloud._initial must reflect the pre-placement state for the
        // whole-window replay to re-derive the same schedule.
        let server = Server::new(crate::server::ServerId(1), ResourceVector::new(16.0, 8.0), Location::new("A"));
        let mut cloud = Cloud::new(vec![server]);
        let vm = VirtualMachine::new(crate::vm::VmId(1), ResourceVector::new(4.0, 2.0), ts(0), ts(5));
        cloud.apply_real(&Action::Boot(vm)).unwrap();
        cloud.reset_to_real();

        (cloud, env, schedule)
    }

    #[test]
    fn single_vm_scenario_energy_matches_spec_example() {
        let (mut cloud, env, schedule) = single_server_setup();
        let evaluator = Evaluator::deterministic(ResourceWeights::uniform());
        let result = evaluator.simulation_result(&mut cloud, &env, &schedule, &HashMap::new(), 1000.0, None, None);

        // u = CPU/8 = 0.25 for 5h; IT energy = 5h * (100 + 0.25*100) / 1000 = 0.625 kWh.
        assert!((result.it_energy_kwh - 0.625).abs() < 1e-9, "got {}", result.it_energy_kwh);
        assert!((result.it_cost - 0.0625).abs() < 1e-9, "got {}", result.it_cost);
    }

    #[test]
    fn evaluate_returns_values_in_unit_range() {
        let (mut cloud, env, schedule) = single_server_setup();
        let evaluator = Evaluator::deterministic(ResourceWeights::uniform());
        let r = evaluator.evaluate(&mut cloud, &env, &schedule, None, None);
        for v in [r.util_penalty, r.utilprice_penalty, r.constraint_penalty, r.sla_penalty] {
            assert!((0.0..=1.0).contains(&v), "penalty out of range: {v}");
        }
    }

    #[test]
    fn sla_penalty_increases_with_more_migrations() {
        let (mut cloud, _env, schedule) = single_server_setup();

        let mut schedule_more = schedule.clone();
        schedule_more.add(ts(2), Action::Migrate(crate::vm::VmId(1), crate::server::ServerId(1)));
        schedule_more.add(ts(3), Action::Migrate(crate::vm::VmId(1), crate::server::ServerId(1)));

        let p1 = sla_penalty(&mut cloud, &schedule, ts(0), ts(5), false);
        let p2 = sla_penalty(&mut cloud, &schedule_more, ts(0), ts(5), false);
        assert!(p2 >= p1, "p1={p1} p2={p2}");
    }

    #[test]
    fn constraint_penalty_is_zero_when_fully_satisfied() {
        let (mut cloud, _env, schedule) = single_server_setup();
        let p = constraint_penalty(&mut cloud, &schedule, ts(0), ts(5), false);
        assert!((p - 0.0).abs() < 1e-9, "got {p}");
    }

    #[test]
    fn linear_cooling_model_is_flat_below_limit() {
        let cooling = LinearCoolingModel::default();
        assert_eq!(cooling.ppue(10.0), 1.0);
        assert!(cooling.ppue(30.0) > 1.0);
    }

    #[test]
    fn simulation_result_serializes_as_the_spec_output_record() {
        let result = SimulationResult {
            it_energy_kwh: 0.625,
            it_cost: 0.0625,
            total_energy_kwh: 0.7,
            total_cost: 0.08,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"it_energy_kwh\":0.625"));
        assert!(json.contains("\"total_cost\":0.08"));
    }
}

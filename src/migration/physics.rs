//! Live-migration cost model (Liu et al. iterative precopy; spec.md
//! §4.F.5).
//!
//! All memory quantities are tracked in MB and bandwidth in Mb/s, matching
//! the units the VM demand vector and configuration already use, so no
//! conversion happens inside this module beyond the one the formulas
//! themselves require (Mb/s -> MB/s for the transfer-time division).

use crate::server::Location;
use crate::vm::VirtualMachine;

/// Residual working-set size (MB) at which iterative precopy gives up and
/// stop-and-copy takes over.
pub const V_THD: f64 = 100.0;
const ALPHA: f64 = 0.512;
const BETA: f64 = 20.165;
/// Assumed dirty-page rate (MB/s), uniform across VMs.
pub const DIRTY_PAGE_RATE: f64 = 4.0;

fn mbps(bandwidth_mbit_s: f64) -> f64 {
    bandwidth_mbit_s / 8.0
}

/// Number of precopy iterations before residual dirty memory drops below
/// [`V_THD`]. `0` if the VM's memory demand is already at or below the
/// threshold, or if the dirty-page rate doesn't exceed the link
/// (migration would converge without iterating).
fn iteration_count(memory_mb: f64, bandwidth_mbit_s: f64) -> u32 {
    if memory_mb <= V_THD {
        return 0;
    }
    let ratio = DIRTY_PAGE_RATE / mbps(bandwidth_mbit_s);
    if ratio <= 0.0 || ratio >= 1.0 {
        return 0;
    }
    let n = (V_THD / memory_mb).log(ratio);
    n.ceil().max(0.0) as u32
}

/// Total data transferred (MB) across all precopy iterations.
fn volume_transferred(memory_mb: f64, bandwidth_mbit_s: f64) -> f64 {
    let ratio = DIRTY_PAGE_RATE / mbps(bandwidth_mbit_s);
    if ratio <= 0.0 || (ratio - 1.0).abs() < 1e-9 {
        return memory_mb;
    }
    let n = iteration_count(memory_mb, bandwidth_mbit_s);
    memory_mb * (1.0 - ratio.powi(n as i32 + 1)) / (1.0 - ratio)
}

/// Migration duration in seconds.
pub fn migration_time(vm: &VirtualMachine, bandwidth_mbit_s: f64) -> f64 {
    let v_mig = volume_transferred(vm.demand.get(crate::resource::ResourceKind::Ram), bandwidth_mbit_s);
    v_mig / mbps(bandwidth_mbit_s)
}

/// Migration energy in Joules: `alpha * V_mig + beta`.
pub fn migration_energy(vm: &VirtualMachine, bandwidth_mbit_s: f64) -> f64 {
    let v_mig = volume_transferred(vm.demand.get(crate::resource::ResourceKind::Ram), bandwidth_mbit_s);
    ALPHA * v_mig + BETA
}

/// Downtime (seconds) incurred by the final stop-and-copy of the residual
/// working set at [`V_THD`].
pub fn predicted_downtime(vm: &VirtualMachine, bandwidth_mbit_s: f64) -> f64 {
    let _ = vm;
    V_THD / mbps(bandwidth_mbit_s)
}

/// `1 J = 1 / 3.6e6 kWh`.
pub fn joule_to_kwh(joules: f64) -> f64 {
    joules / 3_600_000.0
}

/// Expected electricity cost of migrating `vm`, at the mean of the
/// source and destination spot prices (`$`/kWh).
pub fn migration_cost(vm: &VirtualMachine, bandwidth_mbit_s: f64, price_current: f64, price_remote: f64) -> f64 {
    let kwh = joule_to_kwh(migration_energy(vm, bandwidth_mbit_s));
    kwh * (price_current + price_remote) / 2.0
}

/// Resolves the migration bandwidth for a destination location, preferring
/// a per-location override over the fixed default (spec.md §6
/// `bandwidth_map[loc]`).
pub fn bandwidth_for(loc: &Location, bandwidth_map: &std::collections::HashMap<Location, f64>, fixed: f64) -> f64 {
    bandwidth_map.get(loc).copied().unwrap_or(fixed)
}

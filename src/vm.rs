//! Virtual machine resource demand and SLA bookkeeping.

use std::collections::HashMap;

use crate::resource::ResourceVector;
use crate::server::ServerId;
use crate::timeseries::Timestamp;

/// Stable VM identifier. Back-references (VM -> Server) are bookkeeping by
/// id, never an owning pointer, per the design notes in spec.md §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmId(pub u32);

/// A virtual machine: its resource demand plus the mutable fields the
/// scheduler and evaluator update as it lives out its lifecycle
/// (spec.md §3: "VMs carry a demand vector, plus mutable fields `downtime`
/// ..., `penalties` ..., and `server` ...").
#[derive(Debug, Clone)]
pub struct VirtualMachine {
    pub id: VmId,
    pub demand: ResourceVector,
    /// When this VM's boot request arrives.
    pub start_time: Timestamp,
    /// When this VM's delete request arrives (its natural end of life).
    pub end_time: Timestamp,
    /// Accumulated downtime in seconds, from migrations committed so far.
    pub downtime: f64,
    /// SLA-tier counter; indexes into the VM's ordered threshold tiers.
    pub penalties: u32,
    /// Current host, or `None` if unallocated (not yet placed, or
    /// removed from an underutilised host awaiting reassignment).
    pub server: Option<ServerId>,
}

impl VirtualMachine {
    pub fn new(id: VmId, demand: ResourceVector, start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            id,
            demand,
            start_time,
            end_time,
            downtime: 0.0,
            penalties: 0,
            server: None,
        }
    }

    /// `(end_time - t)` clamped at zero, matching
    /// `Environment::get_remaining_duration` in spec.md §4.E.
    pub fn remaining_duration(&self, t: Timestamp) -> chrono::Duration {
        let remaining = self.end_time - t;
        remaining.max(chrono::Duration::zero())
    }
}

/// Ordered SLA downtime-tolerance thresholds (seconds) for one VM's three
/// penalty tiers, indexed by `VirtualMachine::penalties`. A VM at or past
/// tier 3 is always treated as certain to incur an SLA penalty
/// (spec.md §4.F.4, `p_sla`).
#[derive(Debug, Clone, Copy)]
pub struct SlaThresholds {
    pub tiers: [f64; 3],
}

impl SlaThresholds {
    pub fn new(tier0: f64, tier1: f64, tier2: f64) -> Self {
        Self {
            tiers: [tier0, tier1, tier2],
        }
    }

    pub fn threshold_for(&self, penalties: u32) -> Option<f64> {
        self.tiers.get(penalties as usize).copied()
    }
}

/// The single source of truth for VM data (demand, downtime, penalties,
/// current host). Owned by `Cloud`, not by any individual `State` -- the
/// three States track only allocation *topology* (which VM is on which
/// server), so resetting `_current` to `_real` or `_initial` never rolls
/// back a VM's accumulated downtime or penalty tier, matching the "mutable
/// fields are written only at action commit" rule in spec.md §5.
#[derive(Debug, Clone, Default)]
pub struct VmRegistry {
    vms: HashMap<VmId, VirtualMachine>,
}

impl VmRegistry {
    pub fn new() -> Self {
        Self { vms: HashMap::new() }
    }

    pub fn insert(&mut self, vm: VirtualMachine) {
        self.vms.insert(vm.id, vm);
    }

    pub fn get(&self, id: VmId) -> Option<&VirtualMachine> {
        self.vms.get(&id)
    }

    pub fn get_mut(&mut self, id: VmId) -> Option<&mut VirtualMachine> {
        self.vms.get_mut(&id)
    }

    pub fn remove(&mut self, id: VmId) -> Option<VirtualMachine> {
        self.vms.remove(&id)
    }

    pub fn contains(&self, id: VmId) -> bool {
        self.vms.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    pub fn demand_of(&self, id: VmId) -> ResourceVector {
        self.vms.get(&id).map(|vm| vm.demand).unwrap_or_default()
    }
}

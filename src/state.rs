//! One allocation snapshot plus constraint queries (spec.md §3, §4.B).
//!
//! A `State` is the allocation *topology* only -- which server hosts which
//! VM, and which VMs are paused/suspended. VM data proper (demand,
//! downtime, penalty tier, current host) lives in the `Cloud`-owned
//! [`VmRegistry`](crate::vm::VmRegistry), shared across all three of the
//! Cloud's states, so that `State::copy` (here, plain `Clone`) deep-copies
//! the alloc sets while "sharing Server/VM identities", exactly as spec.md
//! §4.B specifies.

use std::collections::{HashMap, HashSet};

use crate::action::Action;
use crate::resource::{ResourceVector, ResourceWeights};
use crate::server::{Location, Server, ServerId};
use crate::vm::{VmId, VmRegistry};

/// Non-fatal domain violations (spec.md §7). These never abort a run --
/// callers log them and fold them into penalty signals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("placing vm {vm:?} on server {server:?} would exceed capacity")]
    CapacityViolation { vm: VmId, server: ServerId },
    #[error("vm {0:?} is not currently allocated")]
    MissingAllocation(VmId),
}

#[derive(Debug, Clone)]
pub struct State {
    /// Identity-stable for the run (spec.md §3); Server has no mutable
    /// fields so cloning this vector is equivalent to sharing identity.
    pub servers: Vec<Server>,
    pub known_vms: HashSet<VmId>,
    pub alloc: HashMap<ServerId, HashSet<VmId>>,
    pub paused: HashSet<VmId>,
    pub suspended: HashSet<VmId>,
}

impl State {
    pub fn new(servers: Vec<Server>) -> Self {
        let mut alloc = HashMap::new();
        for s in &servers {
            alloc.insert(s.id, HashSet::new());
        }
        Self {
            servers,
            known_vms: HashSet::new(),
            alloc,
            paused: HashSet::new(),
            suspended: HashSet::new(),
        }
    }

    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// I1: at most one host per VM.
    pub fn allocation(&self, vm: VmId) -> Option<ServerId> {
        self.alloc
            .iter()
            .find(|(_, vms)| vms.contains(&vm))
            .map(|(server, _)| *server)
    }

    pub fn is_allocated(&self, vm: VmId) -> bool {
        self.allocation(vm).is_some()
    }

    pub fn all_allocated(&self) -> bool {
        self.known_vms.iter().all(|&vm| self.is_allocated(vm))
    }

    /// Capacity used on `server`, summing the demand of every VM currently
    /// allocated there -- including paused ones, since their resources
    /// stay reserved (spec.md §4.B: "paused VMs ... still count toward
    /// capacity").
    pub fn capacity_used(&self, server: ServerId, registry: &VmRegistry) -> ResourceVector {
        let mut used = ResourceVector::zero();
        if let Some(vms) = self.alloc.get(&server) {
            for &vm in vms {
                used = used.add(registry.demand_of(vm));
            }
        }
        used
    }

    pub fn within_capacity(&self, server: ServerId, registry: &VmRegistry) -> bool {
        match self.server(server) {
            Some(s) => self.capacity_used(server, registry).fits_within(s.capacity),
            None => false,
        }
    }

    pub fn all_within_capacity(&self, registry: &VmRegistry) -> bool {
        self.servers.iter().all(|s| self.within_capacity(s.id, registry))
    }

    /// Fraction of servers within capacity, in `[0, 1]`. `1.0` (vacuously)
    /// with zero servers.
    pub fn ratio_within_capacity(&self, registry: &VmRegistry) -> f64 {
        if self.servers.is_empty() {
            return 1.0;
        }
        let ok = self
            .servers
            .iter()
            .filter(|s| self.within_capacity(s.id, registry))
            .count();
        ok as f64 / self.servers.len() as f64
    }

    /// Fraction of known VMs that are allocated, in `[0, 1]`. `1.0`
    /// (vacuously) with zero known VMs.
    pub fn ratio_allocated(&self) -> f64 {
        if self.known_vms.is_empty() {
            return 1.0;
        }
        let allocated = self.known_vms.iter().filter(|&&vm| self.is_allocated(vm)).count();
        allocated as f64 / self.known_vms.len() as f64
    }

    /// `1 - ratio_within_capacity`, the simplified evaluator's constraint
    /// signal (spec.md §4.B, §4.G "simplified evaluator").
    pub fn capacity_penalty(&self, registry: &VmRegistry) -> f64 {
        1.0 - self.ratio_within_capacity(registry)
    }

    /// Per-server weighted utilisation. Paused and suspended VMs are
    /// excluded from the utilisation (they "contribute 0 power") even
    /// though their demand still occupies capacity.
    pub fn calculate_utilisations(&self, registry: &VmRegistry, weights: &ResourceWeights) -> HashMap<ServerId, f64> {
        let mut out = HashMap::new();
        for s in &self.servers {
            let mut used = ResourceVector::zero();
            if let Some(vms) = self.alloc.get(&s.id) {
                for &vm in vms {
                    if self.paused.contains(&vm) || self.suspended.contains(&vm) {
                        continue;
                    }
                    used = used.add(registry.demand_of(vm));
                }
            }
            out.insert(s.id, ResourceVector::weighted_utilisation(used, s.capacity, weights));
        }
        out
    }

    /// Sum of server utilisations grouped by location (spec.md §4.F.4
    /// `p_dc`'s `_get_dc_load`).
    pub fn calculate_utilisations_per_location(
        &self,
        registry: &VmRegistry,
        weights: &ResourceWeights,
    ) -> HashMap<Location, f64> {
        let per_server = self.calculate_utilisations(registry, weights);
        let mut out: HashMap<Location, f64> = HashMap::new();
        for s in &self.servers {
            *out.entry(s.loc.clone()).or_insert(0.0) += per_server.get(&s.id).copied().unwrap_or(0.0);
        }
        out
    }

    /// Applies `action` in place. VM-identity-level mutable fields
    /// (`server`, `downtime`, `penalties`) live on `registry`, not here;
    /// committing an action updates both together.
    fn apply_mut(&mut self, action: &Action, registry: &mut VmRegistry) -> Result<(), DomainError> {
        match action {
            Action::Boot(vm) => {
                self.known_vms.insert(vm.id);
                if !registry.contains(vm.id) {
                    registry.insert(vm.clone());
                }
                Ok(())
            }
            Action::Delete(vm) => {
                if let Some(server) = self.allocation(*vm) {
                    self.alloc.get_mut(&server).unwrap().remove(vm);
                }
                self.known_vms.remove(vm);
                self.paused.remove(vm);
                self.suspended.remove(vm);
                registry.remove(*vm);
                Ok(())
            }
            Action::Migrate(vm, server) => {
                if self.allocation(*vm) == Some(*server) {
                    return Ok(()); // idempotent
                }
                let target = self
                    .server(*server)
                    .ok_or(DomainError::CapacityViolation { vm: *vm, server: *server })?
                    .capacity;
                let demand = registry.demand_of(*vm);
                let used_excl_self = {
                    let mut u = self.capacity_used(*server, registry);
                    u = u.sub(if self.alloc[server].contains(vm) { demand } else { ResourceVector::zero() });
                    u
                };
                if !used_excl_self.add(demand).fits_within(target) {
                    return Err(DomainError::CapacityViolation { vm: *vm, server: *server });
                }
                if let Some(old) = self.allocation(*vm) {
                    self.alloc.get_mut(&old).unwrap().remove(vm);
                }
                self.alloc.get_mut(server).unwrap().insert(*vm);
                self.known_vms.insert(*vm);
                if let Some(v) = registry.get_mut(*vm) {
                    v.server = Some(*server);
                }
                Ok(())
            }
            Action::Pause(vm) => {
                if !self.is_allocated(*vm) {
                    return Err(DomainError::MissingAllocation(*vm));
                }
                self.paused.insert(*vm);
                Ok(())
            }
            Action::Unpause(vm) => {
                self.paused.remove(vm);
                Ok(())
            }
        }
    }

    /// Returns a new `State` with `action` applied; `self` is unchanged
    /// (spec.md §4.B `transition`). Registry mutations (VM identity
    /// fields) are committed regardless, matching the "written only at
    /// action commit" rule (spec.md §5) -- they are not part of the
    /// rolled-back topology.
    pub fn transition(&self, action: &Action, registry: &mut VmRegistry) -> Result<State, DomainError> {
        let mut next = self.clone();
        next.apply_mut(action, registry)?;
        Ok(next)
    }
}

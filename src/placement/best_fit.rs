//! Best-Fit-Decreasing placement, as used by OpenStack Neat
//! (`original_source/philharmonic/scheduler/bfd_scheduler.py`).
//!
//! Distinct from [`super::CheapestHost`]: BFD ranks candidate *servers*
//! by ascending free capacity (tightest fit first) rather than ranking
//! *locations* by price. It is additive to this crate -- none of
//! spec.md §4.F.6's six scenarios select it; it exists as a second
//! implementation of [`PlacementStrategy`] for callers who want a
//! packing-density policy instead of a cost-aware one.

use super::PlacementStrategy;
use crate::cloud::Cloud;
use crate::environment::Environment;
use crate::resource::{ResourceKind, ResourceVector};
use crate::server::{Location, Server, ServerId};
use crate::state::State;
use crate::vm::{VirtualMachine, VmRegistry};

pub struct BestFitDecreasing;

impl BestFitDecreasing {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BestFitDecreasing {
    fn default() -> Self {
        Self::new()
    }
}

fn free_capacity(state: &State, server: &Server, registry: &VmRegistry) -> ResourceVector {
    server.capacity.sub(state.capacity_used(server.id, registry))
}

impl PlacementStrategy for BestFitDecreasing {
    fn select_host(
        &self,
        vm: &VirtualMachine,
        cloud: &Cloud,
        _env: &Environment,
        exclude_loc: Option<&Location>,
    ) -> Option<ServerId> {
        let state = cloud.get_current();
        let registry = cloud.registry();

        // `sort_pms_increasing`'s key in the Python original is
        // `(free_cap['#CPUs'], free_cap['RAM'])`: CPUs break ties first.
        let mut servers: Vec<&Server> = cloud
            .servers()
            .iter()
            .filter(|s| exclude_loc.map(|loc| s.loc != *loc).unwrap_or(true))
            .collect();
        servers.sort_by(|a, b| {
            let free_a = free_capacity(state, a, registry);
            let free_b = free_capacity(state, b, registry);
            free_a
                .get(ResourceKind::Cpus)
                .partial_cmp(&free_b.get(ResourceKind::Cpus))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    free_a
                        .get(ResourceKind::Ram)
                        .partial_cmp(&free_b.get(ResourceKind::Ram))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        servers
            .into_iter()
            .find(|s| {
                let used = state.capacity_used(s.id, registry);
                used.add(vm.demand).fits_within(s.capacity)
            })
            .map(|s| s.id)
    }
}

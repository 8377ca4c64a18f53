//! Best-Cost-Decreasing scheduler core (spec.md §4.F.1).
//!
//! Ties a [`PlacementStrategy`] and a [`MigrationStrategy`] together per
//! the selected [`Scenario`](crate::config::Scenario) and drives one
//! tick's worth of decisions. Mirrors the teacher's `Scheduler`, which
//! also holds a placement algorithm and produces allocation decisions for
//! the simulator to commit -- minus the event-driven machinery, since this
//! crate's scheduler runs synchronously inside the simulator's tick loop
//! rather than reacting to emitted events.

use log::{error, warn};

use crate::action::Action;
use crate::cloud::Cloud;
use crate::config::{Scenario, SimulationConfig};
use crate::environment::{Environment, RequestKind};
use crate::migration::physics::{self, bandwidth_for};
use crate::migration::{MigrationStrategy, NoMigration, UtilityMigration};
use crate::placement::{CheapestHost, PlacementStrategy, RandomFit};
use crate::schedule::Schedule;

pub struct BcdScheduler {
    placement: Box<dyn PlacementStrategy>,
    migration: Box<dyn MigrationStrategy>,
}

impl BcdScheduler {
    pub fn new(placement: Box<dyn PlacementStrategy>, migration: Box<dyn MigrationStrategy>) -> Self {
        Self { placement, migration }
    }

    /// Resolves the placement/migration pair for one of the six policy
    /// scenarios (spec.md §4.F.6).
    pub fn for_scenario(scenario: Scenario, config: &SimulationConfig) -> Self {
        let (placement, migration): (Box<dyn PlacementStrategy>, Box<dyn MigrationStrategy>) = match scenario {
            Scenario::RandomFitNoMigration => (Box::new(RandomFit::new()), Box::new(NoMigration)),
            Scenario::CheapestNowNoMigration => (Box::new(CheapestHost::now()), Box::new(NoMigration)),
            Scenario::CheapestForecastNoMigration => (Box::new(CheapestHost::forecast(config)), Box::new(NoMigration)),
            Scenario::CheapestNowUtilityCurrent => (Box::new(CheapestHost::now()), Box::new(UtilityMigration::current_prices())),
            Scenario::CheapestForecastUtilityForecast => {
                (Box::new(CheapestHost::forecast(config)), Box::new(UtilityMigration::forecast()))
            }
            Scenario::CheapestForecastIdealUtilityIdeal => {
                (Box::new(CheapestHost::forecast_ideal(config)), Box::new(UtilityMigration::ideal_forecast()))
            }
        };
        Self::new(placement, migration)
    }

    /// Runs the per-tick algorithm (spec.md §4.F.1) against `cloud`'s
    /// `_current` state and returns the resulting tentative Schedule.
    /// Leaves `cloud` reset to `_real` on return.
    pub fn reevaluate(&self, cloud: &mut Cloud, env: &Environment, config: &SimulationConfig) -> Schedule {
        let mut schedule = Schedule::new();

        for request in env.get_requests() {
            let vm = match &request.kind {
                RequestKind::Boot(vm) => vm,
                RequestKind::Delete(_) => continue,
            };
            match self.placement.select_host(vm, cloud, env, None) {
                Some(server) => {
                    let action = Action::Migrate(vm.id, server);
                    if let Err(e) = cloud.apply(&action) {
                        warn!("placement for vm {:?} rejected at commit: {e}", vm.id);
                        continue;
                    }
                    schedule.add(request.timestamp, action);
                }
                None => {
                    error!("no feasible server for vm {:?}; request dropped", vm.id);
                }
            }
        }

        let t_next = env.get_time() + env.get_period();
        if t_next < env.end {
            let migrations = self.migration.select_migrations(cloud, env, config);
            for (vm_id, loc) in migrations {
                let server = cloud
                    .servers()
                    .iter()
                    .filter(|s| s.loc == loc)
                    .find(|s| {
                        let used = cloud.get_current().capacity_used(s.id, cloud.registry());
                        let demand = cloud.registry().demand_of(vm_id);
                        used.add(demand).fits_within(s.capacity)
                    })
                    .map(|s| s.id);

                let Some(server) = server else { continue };

                let bandwidth = bandwidth_for(&loc, &config.bandwidth_map, config.fixed_bandwidth);
                // Committed at commit time, per spec.md §5; survives the
                // end-of-tick reset_to_real since it lives on the shared
                // registry, not on the rolled-back topology.
                if let Some(vm_mut) = cloud.registry_mut().get_mut(vm_id) {
                    let predicted = physics::predicted_downtime(vm_mut, bandwidth);
                    vm_mut.downtime += predicted;
                }

                let action = Action::Migrate(vm_id, server);
                if cloud.apply(&action).is_ok() {
                    schedule.add(t_next, action);
                }
            }
        }

        cloud.reset_to_real();
        schedule
    }
}

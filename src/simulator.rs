//! Drives the simulation tick by tick (spec.md §4.H).

use log::warn;

use crate::action::Action;
use crate::cloud::Cloud;
use crate::config::SimulationConfig;
use crate::driver::Driver;
use crate::environment::{Environment, RequestKind};
use crate::schedule::Schedule;
use crate::scheduler::BcdScheduler;
use crate::timeseries::Timestamp;

pub struct Simulator {
    cloud: Cloud,
    environment: Environment,
    config: SimulationConfig,
    scheduler: BcdScheduler,
    driver: Box<dyn Driver>,
    real_schedule: Schedule,
}

impl Simulator {
    pub fn new(cloud: Cloud, environment: Environment, config: SimulationConfig, driver: Box<dyn Driver>) -> Self {
        let scheduler = BcdScheduler::for_scenario(config.scenario, &config);
        Self {
            cloud,
            environment,
            config,
            scheduler,
            driver,
            real_schedule: Schedule::new(),
        }
    }

    /// Commits `actions` to `_real` (and, via `apply_real`, `_current`),
    /// forwards each to the driver, and records it in the real schedule.
    /// A rejected action (an invariant violation at commit time) is
    /// logged and skipped rather than aborting the run (spec.md §7).
    fn apply_actions(&mut self, actions: Vec<(Timestamp, Action)>) {
        for (t, action) in actions {
            if let Err(e) = self.cloud.apply_real(&action) {
                warn!("action rejected at commit time: {e}");
                continue;
            }
            self.driver.apply_action(&action, t);
            self.real_schedule.add(t, action);
        }
    }

    /// Runs every tick in `[environment.start, environment.end]` and
    /// returns the final `(cloud, environment, real_schedule)`.
    pub fn run(mut self) -> (Cloud, Environment, Schedule) {
        let times = self.environment.itertimes();
        for t in times {
            self.environment.set_time(t);

            let request_actions: Vec<(Timestamp, Action)> = self
                .environment
                .get_requests()
                .into_iter()
                .map(|r| {
                    let action = match &r.kind {
                        RequestKind::Boot(vm) => Action::Boot(vm.clone()),
                        RequestKind::Delete(id) => Action::Delete(*id),
                    };
                    (r.timestamp, action)
                })
                .collect();
            self.apply_actions(request_actions);

            let schedule = self.scheduler.reevaluate(&mut self.cloud, &self.environment, &self.config);
            let period = self.environment.get_period();
            let actions: Vec<(Timestamp, Action)> = schedule
                .filter_current_actions(t, period)
                .into_iter()
                .map(|(at, a)| (at, a.clone()))
                .collect();
            self.apply_actions(actions);
        }

        (self.cloud, self.environment, self.real_schedule)
    }
}

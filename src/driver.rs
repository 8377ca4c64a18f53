//! Driver plug-in seam (spec.md §6): the boundary between committed
//! actions and whatever actually carries them out. A real driver would
//! dispatch to a hypervisor API; this crate ships only the simulated one.

use crate::action::Action;
use crate::timeseries::Timestamp;

/// One action as observed by a driver, paired with the timestamp it
/// committed at.
#[derive(Debug, Clone)]
pub struct DriverEvent {
    pub timestamp: Timestamp,
    pub action: Action,
}

pub trait Driver {
    fn boot(&mut self, action: &Action, t: Timestamp);
    fn delete(&mut self, action: &Action, t: Timestamp);
    fn migrate(&mut self, action: &Action, t: Timestamp);
    fn pause(&mut self, action: &Action, t: Timestamp);
    fn unpause(&mut self, action: &Action, t: Timestamp);

    /// Dispatches `action` to the matching typed method based on its
    /// variant.
    fn apply_action(&mut self, action: &Action, t: Timestamp) {
        match action {
            Action::Boot(_) => self.boot(action, t),
            Action::Delete(_) => self.delete(action, t),
            Action::Migrate(_, _) => self.migrate(action, t),
            Action::Pause(_) => self.pause(action, t),
            Action::Unpause(_) => self.unpause(action, t),
        }
    }
}

/// Records every committed action into an in-memory event log, instead of
/// dispatching anywhere -- the driver this crate's simulator actually
/// uses.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    events: Vec<DriverEvent>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events(&self) -> &[DriverEvent] {
        &self.events
    }

    fn record(&mut self, action: &Action, t: Timestamp) {
        self.events.push(DriverEvent { timestamp: t, action: action.clone() });
    }
}

impl Driver for SimulatedDriver {
    fn boot(&mut self, action: &Action, t: Timestamp) {
        self.record(action, t);
    }

    fn delete(&mut self, action: &Action, t: Timestamp) {
        self.record(action, t);
    }

    fn migrate(&mut self, action: &Action, t: Timestamp) {
        self.record(action, t);
    }

    fn pause(&mut self, action: &Action, t: Timestamp) {
        self.record(action, t);
    }

    fn unpause(&mut self, action: &Action, t: Timestamp) {
        self.record(action, t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VmId;
    use chrono::{TimeZone, Utc};

    fn ts(h: i64) -> Timestamp {
        Utc.timestamp_opt(0, 0).unwrap() + chrono::Duration::hours(h)
    }

    #[test]
    fn apply_action_dispatches_by_variant() {
        let mut driver = SimulatedDriver::new();
        driver.apply_action(&Action::Pause(VmId(1)), ts(0));
        driver.apply_action(&Action::Delete(VmId(1)), ts(1));
        assert_eq!(driver.events().len(), 2);
        assert!(matches!(driver.events()[0].action, Action::Pause(_)));
        assert!(matches!(driver.events()[1].action, Action::Delete(_)));
    }
}

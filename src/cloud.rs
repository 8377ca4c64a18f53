//! The cloud: three speculative/rollback states sharing one VM registry
//! and one fixed set of servers (spec.md §4.D).
//!
//! - `_initial` -- the frozen bootstrap state the cloud was constructed
//!   with; only [`Cloud::checkpoint`] moves it forward.
//! - `_current` -- the scheduler's working copy, mutated tentatively while
//!   it explores placements/migrations.
//! - `_real` -- the last state actually committed to the simulated world.
//!
//! Resetting `_current` to `_initial` or `_real` only discards topology
//! changes; VM identity data in the shared registry is never rolled back
//! (see [`crate::vm::VmRegistry`]).

use crate::action::Action;
use crate::server::Server;
use crate::state::{DomainError, State};
use crate::vm::VmRegistry;

#[derive(Debug, Clone)]
pub struct Cloud {
    servers: Vec<Server>,
    registry: VmRegistry,
    initial: State,
    real: State,
    current: State,
}

impl Cloud {
    pub fn new(servers: Vec<Server>) -> Self {
        let state = State::new(servers.clone());
        Self {
            servers,
            registry: VmRegistry::new(),
            initial: state.clone(),
            real: state.clone(),
            current: state,
        }
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn registry(&self) -> &VmRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VmRegistry {
        &mut self.registry
    }

    pub fn get_current(&self) -> &State {
        &self.current
    }

    pub fn get_real(&self) -> &State {
        &self.real
    }

    pub fn get_initial(&self) -> &State {
        &self.initial
    }

    /// Tentatively applies `action` against `_current`, mutating the
    /// shared registry as a side effect of commit (spec.md §4.D `apply`).
    pub fn apply(&mut self, action: &Action) -> Result<(), DomainError> {
        self.current = self.current.transition(action, &mut self.registry)?;
        Ok(())
    }

    /// Commits `action` to `_real` as well as `_current` -- used once the
    /// simulator has decided an action actually happens this tick, not
    /// merely that the scheduler considered it (spec.md §4.D `apply_real`).
    pub fn apply_real(&mut self, action: &Action) -> Result<(), DomainError> {
        self.real = self.real.transition(action, &mut self.registry)?;
        self.current = self.current.transition(action, &mut self.registry)?;
        Ok(())
    }

    /// Discards tentative changes: `_current` reverts to `_real`.
    /// `_initial` is untouched -- it is the frozen bootstrap (spec.md
    /// §3), not a rolling per-tick baseline; call [`Cloud::checkpoint`]
    /// explicitly where a new baseline is actually wanted.
    pub fn reset_to_real(&mut self) {
        self.current = self.real.clone();
    }

    /// Rewinds `_current` to the state at the start of the round, without
    /// touching `_real` -- used when a scheduler explores several
    /// candidate placements from the same starting point.
    pub fn reset_to_initial(&mut self) {
        self.current = self.initial.clone();
    }

    /// Marks the present `_current` as the new round baseline, e.g. after
    /// the simulator advances to a new tick.
    pub fn checkpoint(&mut self) {
        self.initial = self.current.clone();
    }
}

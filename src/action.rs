//! Actions: the pure State -> State transition functions.
//!
//! spec.md §3 models an action as "a tagged variant: `Boot(vm)`,
//! `Delete(vm)`, `Migrate(vm, server)`, `Pause(vm)`, `Unpause(vm)`" rather
//! than method-delegating objects, "to avoid cyclic object graphs"
//! (design notes, §9). `Delete` is kept first-class here rather than a
//! side-channel cleanup event, for the same uniformity reason (see
//! DESIGN.md's resolution of the corresponding Open Question).

use crate::server::ServerId;
use crate::vm::{VirtualMachine, VmId};

#[derive(Debug, Clone)]
pub enum Action {
    /// Registers a newly-arrived VM as known to the state. Does not place
    /// it on any server -- placement is a subsequent `Migrate` from no
    /// current host, matching the BCD scheduler's "boot modeled as a
    /// migration from nil" (spec.md §4.F.1).
    Boot(VirtualMachine),
    /// Removes a VM from the cloud entirely: unallocated, unpaused, and
    /// forgotten.
    Delete(VmId),
    /// Places `vm` on `server`. Idempotent if already there; otherwise
    /// removed from its current host (if any) first.
    Migrate(VmId, ServerId),
    Pause(VmId),
    Unpause(VmId),
}

impl Action {
    /// The VM this action concerns, for migration-rate bookkeeping in the
    /// evaluator (spec.md §4.G, "For every committed `Migrate`...").
    pub fn vm_id(&self) -> VmId {
        match self {
            Action::Boot(vm) => vm.id,
            Action::Delete(id) => *id,
            Action::Migrate(id, _) => *id,
            Action::Pause(id) => *id,
            Action::Unpause(id) => *id,
        }
    }
}

//! Migration selection: the scheduler's decision of *which* running VMs
//! to relocate, separate from `placement`'s decision of *where* new VMs
//! land (spec.md §4.F.4, §4.F.5).

pub mod physics;
mod utility;

pub use utility::{MigrationStrategy, NoMigration, UtilityMigration};

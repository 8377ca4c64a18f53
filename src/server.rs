//! Physical server (host) capacity and location.

use crate::resource::ResourceVector;

/// Stable server identifier, assigned once at `Cloud` construction.
/// Servers are created once and never destroyed (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerId(pub u32);

/// An electricity-price/temperature location tag. Locations are compared
/// and hashed by name, and iterated in the order they were first inserted
/// into the `Environment` (spec.md §4.F.3: "Tie-breaking: stable by
/// location insertion order").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location(pub String);

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical machine with a fixed capacity vector at a fixed location.
#[derive(Debug, Clone)]
pub struct Server {
    pub id: ServerId,
    pub capacity: ResourceVector,
    pub loc: Location,
}

impl Server {
    pub fn new(id: ServerId, capacity: ResourceVector, loc: Location) -> Self {
        Self { id, capacity, loc }
    }
}

//! Typed capacity and demand vectors.
//!
//! spec.md §3 describes resources as "an ordered mapping from resource kind
//! (`RAM`, `#CPUs`, extensible) to a non-negative number". Per the REDESIGN
//! FLAGS / design notes (§9), dynamic string-keyed resource maps become a
//! fixed small enum backed by a dense array rather than a growable map,
//! since the resource set is closed for any given deployment of this crate.

use std::fmt;
use std::ops::{Index, IndexMut};

/// The resource kinds tracked by this crate. `COUNT` is the dense-array
/// width; add a variant and bump `COUNT` (and `ALL`) to extend the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Ram,
    Cpus,
}

impl ResourceKind {
    pub const COUNT: usize = 2;
    pub const ALL: [ResourceKind; Self::COUNT] = [ResourceKind::Ram, ResourceKind::Cpus];

    fn index(self) -> usize {
        match self {
            ResourceKind::Ram => 0,
            ResourceKind::Cpus => 1,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResourceKind::Ram => write!(f, "RAM"),
            ResourceKind::Cpus => write!(f, "#CPUs"),
        }
    }
}

/// A dense vector over [`ResourceKind`], used both as a server's capacity
/// and as a VM's demand. All arithmetic is element-wise; comparisons are
/// componentwise (`a.fits_within(b)` iff every component of `a` is `<=`
/// the matching component of `b`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceVector {
    values: [f64; ResourceKind::COUNT],
}

impl ResourceVector {
    pub fn new(ram: f64, cpus: f64) -> Self {
        let mut values = [0.0; ResourceKind::COUNT];
        values[ResourceKind::Ram.index()] = ram;
        values[ResourceKind::Cpus.index()] = cpus;
        Self { values }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: ResourceKind, value: f64) {
        self.values[kind.index()] = value;
    }

    /// True iff `self` (e.g. a VM's demand) fits within `capacity`
    /// componentwise.
    pub fn fits_within(&self, capacity: ResourceVector) -> bool {
        ResourceKind::ALL.iter().all(|&k| self.get(k) <= capacity.get(k))
    }

    pub fn add(&self, other: ResourceVector) -> ResourceVector {
        let mut out = *self;
        for &k in &ResourceKind::ALL {
            out.values[k.index()] += other.get(k);
        }
        out
    }

    pub fn sub(&self, other: ResourceVector) -> ResourceVector {
        let mut out = *self;
        for &k in &ResourceKind::ALL {
            out.values[k.index()] -= other.get(k);
        }
        out
    }

    /// Weighted utilisation `u = sum_r w_r * (used_r / cap_r)`. Resources
    /// with zero capacity contribute zero rather than dividing by zero.
    pub fn weighted_utilisation(used: ResourceVector, capacity: ResourceVector, weights: &ResourceWeights) -> f64 {
        ResourceKind::ALL
            .iter()
            .map(|&k| {
                let cap = capacity.get(k);
                if cap <= 0.0 {
                    0.0
                } else {
                    weights.get(k) * (used.get(k) / cap)
                }
            })
            .sum()
    }
}

impl Index<ResourceKind> for ResourceVector {
    type Output = f64;
    fn index(&self, kind: ResourceKind) -> &f64 {
        &self.values[kind.index()]
    }
}

impl IndexMut<ResourceKind> for ResourceVector {
    fn index_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        &mut self.values[kind.index()]
    }
}

/// Per-resource utilisation weights. Defaults to uniform `1/|resources|`,
/// overridable per spec.md §4.A ("configurable per-resource weights
/// override uniform").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceWeights {
    values: [f64; ResourceKind::COUNT],
}

impl ResourceWeights {
    pub fn uniform() -> Self {
        let w = 1.0 / ResourceKind::COUNT as f64;
        Self {
            values: [w; ResourceKind::COUNT],
        }
    }

    pub fn custom(ram: f64, cpus: f64) -> Self {
        let mut values = [0.0; ResourceKind::COUNT];
        values[ResourceKind::Ram.index()] = ram;
        values[ResourceKind::Cpus.index()] = cpus;
        Self { values }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.values[kind.index()]
    }
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self::uniform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_is_componentwise() {
        let demand = ResourceVector::new(4.0, 2.0);
        let capacity = ResourceVector::new(16.0, 8.0);
        assert!(demand.fits_within(capacity));
        assert!(!ResourceVector::new(17.0, 1.0).fits_within(capacity));
        assert!(!ResourceVector::new(1.0, 9.0).fits_within(capacity));
    }

    #[test]
    fn weighted_utilisation_uniform() {
        let used = ResourceVector::new(4.0, 2.0);
        let cap = ResourceVector::new(16.0, 8.0);
        let u = ResourceVector::weighted_utilisation(used, cap, &ResourceWeights::uniform());
        // 0.5 * (4/16) + 0.5 * (2/8) = 0.125 + 0.125 = 0.25
        assert!((u - 0.25).abs() < 1e-9);
    }

    #[test]
    fn weighted_utilisation_guards_zero_capacity() {
        let used = ResourceVector::new(4.0, 0.0);
        let cap = ResourceVector::new(16.0, 0.0);
        let u = ResourceVector::weighted_utilisation(used, cap, &ResourceWeights::uniform());
        assert!((u - 0.125).abs() < 1e-9);
    }
}

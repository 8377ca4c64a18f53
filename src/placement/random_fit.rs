//! Scenario 1: ignore prices entirely, scan locations in random order.

use rand::prelude::*;

use super::{first_fit_in_location, PlacementStrategy};
use crate::cloud::Cloud;
use crate::environment::Environment;
use crate::server::{Location, ServerId};
use crate::vm::VirtualMachine;

pub struct RandomFit;

impl RandomFit {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomFit {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementStrategy for RandomFit {
    fn select_host(
        &self,
        vm: &VirtualMachine,
        cloud: &Cloud,
        env: &Environment,
        exclude_loc: Option<&Location>,
    ) -> Option<ServerId> {
        let mut locations: Vec<&Location> = env.locations().filter(|l| Some(*l) != exclude_loc).collect();
        locations.shuffle(&mut thread_rng());
        locations.into_iter().find_map(|loc| first_fit_in_location(vm, loc, cloud))
    }
}

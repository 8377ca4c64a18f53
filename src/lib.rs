//! Geotemporal, cost-aware VM placement and migration scheduler.
//!
//! See each module for its slice of the design: [`resource`]/[`server`]/[`vm`]
//! are the typed data model, [`state`]/[`schedule`]/[`action`] the cloud's
//! allocation topology and its transitions, [`cloud`] the speculative
//! three-state container, [`environment`] the time-varying inputs,
//! [`placement`]/[`migration`]/[`scheduler`] the Best-Cost-Decreasing
//! policy, [`evaluator`] the cost/penalty replay, and [`simulator`] the
//! tick-driving loop.

pub mod action;
pub mod cloud;
pub mod config;
pub mod driver;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod migration;
pub mod placement;
pub mod resource;
pub mod schedule;
pub mod scheduler;
pub mod server;
pub mod simulator;
pub mod state;
pub mod timeseries;
pub mod vm;

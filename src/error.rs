//! Error kinds that abort the simulation.
//!
//! Per the error handling design: domain violations (capacity overflows,
//! unadmitted boot requests, actions against unallocated VMs) are never
//! exceptions here — the scheduler and evaluator convert them into penalty
//! contributions and keep going. Only configuration mistakes and
//! out-of-range data lookups are fatal, and those are the two variants
//! below.

use thiserror::Error;

/// Fatal errors that abort a run before or during scheduling.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Missing weights, bad scenario id, malformed series, weights that
    /// don't sum to a finite positive number, and similar.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Price/temperature lookup at a timestamp outside the loaded series.
    /// Indicates a driver bug further up the stack, not a domain violation.
    #[error("data unavailable at {location} for t={timestamp}")]
    DataUnavailable { location: String, timestamp: i64 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

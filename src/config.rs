//! Simulation configuration, loaded from YAML (spec.md §6).
//!
//! Follows the teacher's `SimulationConfigRaw` + `SimulationConfig` split:
//! every field is `Option` on the wire so a config file only needs to
//! override what it cares about, and `SimulationConfig::from_file` fills
//! the rest from defaults. Unlike the teacher, loading here returns a
//! `Result` rather than panicking, since malformed configuration is one of
//! this crate's two fatal error kinds (spec.md §7 `ConfigurationError`).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::resource::ResourceWeights;
use crate::server::Location;

/// One of the six placement/migration policy combinations (spec.md
/// §4.F.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    RandomFitNoMigration = 1,
    CheapestNowNoMigration = 2,
    CheapestForecastNoMigration = 3,
    CheapestNowUtilityCurrent = 4,
    CheapestForecastUtilityForecast = 5,
    CheapestForecastIdealUtilityIdeal = 6,
}

impl TryFrom<u8> for Scenario {
    type Error = SchedulerError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Scenario::RandomFitNoMigration),
            2 => Ok(Scenario::CheapestNowNoMigration),
            3 => Ok(Scenario::CheapestForecastNoMigration),
            4 => Ok(Scenario::CheapestNowUtilityCurrent),
            5 => Ok(Scenario::CheapestForecastUtilityForecast),
            6 => Ok(Scenario::CheapestForecastIdealUtilityIdeal),
            other => Err(SchedulerError::ConfigurationError(format!("scenario id out of range 1..=6: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SimulationConfigRaw {
    scenario: Option<u8>,
    w_sla: Option<f64>,
    w_energy: Option<f64>,
    w_vm_rem: Option<f64>,
    w_dcload: Option<f64>,
    w_cost: Option<f64>,
    utility_threshold: Option<f64>,
    custom_weight_ram: Option<f64>,
    custom_weight_cpus: Option<f64>,
    max_fc_horizon: Option<u32>,
    fixed_bandwidth: Option<f64>,
    bandwidth_map: Option<HashMap<String, f64>>,
    period_minutes: Option<i64>,
    start: Option<String>,
    end: Option<String>,
    forecast_periods: Option<u32>,
    save_power: Option<bool>,
    save_util: Option<bool>,
    liveplot: Option<bool>,
    fileplot: Option<bool>,
    location_based: Option<bool>,
    prices_in_mwh: Option<bool>,
    alternate_cost_model: Option<bool>,
}

/// Resolved, fully-populated simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub scenario: Scenario,
    pub w_sla: f64,
    pub w_energy: f64,
    pub w_vm_rem: f64,
    pub w_dcload: f64,
    pub w_cost: f64,
    pub utility_threshold: f64,
    pub custom_weights: Option<ResourceWeights>,
    pub max_fc_horizon: u32,
    pub fixed_bandwidth: f64,
    pub bandwidth_map: HashMap<Location, f64>,
    pub period: Duration,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub forecast_periods: u32,
    pub save_power: bool,
    pub save_util: bool,
    pub liveplot: bool,
    pub fileplot: bool,
    pub location_based: bool,
    pub prices_in_mwh: bool,
    pub alternate_cost_model: bool,
}

impl SimulationConfig {
    /// Built-in defaults: scenario 1 (random-fit, no migration) over a
    /// single 24-hour, hour-period day starting at the Unix epoch.
    pub fn new() -> Self {
        Self {
            scenario: Scenario::RandomFitNoMigration,
            w_sla: 0.3,
            w_energy: 0.2,
            w_vm_rem: 0.2,
            w_dcload: 0.15,
            w_cost: 0.15,
            utility_threshold: 0.5,
            custom_weights: None,
            max_fc_horizon: 8,
            fixed_bandwidth: 1000.0,
            bandwidth_map: HashMap::new(),
            period: Duration::hours(1),
            start: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            end: DateTime::<Utc>::from_timestamp(0, 0).unwrap() + Duration::hours(24),
            forecast_periods: 8,
            save_power: false,
            save_util: false,
            liveplot: false,
            fileplot: false,
            location_based: true,
            prices_in_mwh: false,
            alternate_cost_model: false,
        }
    }

    /// Reads parameter values from a YAML file, falling back to defaults
    /// for anything absent. Fatal (`ConfigurationError`) on unreadable
    /// files, malformed YAML, an out-of-range scenario id, or a utility
    /// weight sum that is not finite and positive.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::ConfigurationError(format!("can't read {path}: {e}")))?;
        let raw: SimulationConfigRaw = serde_yaml::from_str(&contents)
            .map_err(|e| SchedulerError::ConfigurationError(format!("can't parse YAML from {path}: {e}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: SimulationConfigRaw) -> Result<Self> {
        let default = Self::new();

        let scenario = match raw.scenario {
            Some(id) => Scenario::try_from(id)?,
            None => default.scenario,
        };

        let w_sla = raw.w_sla.unwrap_or(default.w_sla);
        let w_energy = raw.w_energy.unwrap_or(default.w_energy);
        let w_vm_rem = raw.w_vm_rem.unwrap_or(default.w_vm_rem);
        let w_dcload = raw.w_dcload.unwrap_or(default.w_dcload);
        let w_cost = raw.w_cost.unwrap_or(default.w_cost);
        let sum = w_sla + w_energy + w_vm_rem + w_dcload + w_cost;
        if !sum.is_finite() || sum <= 0.0 {
            return Err(SchedulerError::ConfigurationError(format!(
                "utility weights must sum to a finite positive number, got {sum}"
            )));
        }

        let custom_weights = match (raw.custom_weight_ram, raw.custom_weight_cpus) {
            (None, None) => None,
            (ram, cpus) => Some(ResourceWeights::custom(ram.unwrap_or(0.5), cpus.unwrap_or(0.5))),
        };

        let max_fc_horizon = raw.max_fc_horizon.unwrap_or(default.max_fc_horizon);
        if max_fc_horizon < 1 {
            return Err(SchedulerError::ConfigurationError("max_fc_horizon must be >= 1".into()));
        }

        let bandwidth_map = raw
            .bandwidth_map
            .unwrap_or_default()
            .into_iter()
            .map(|(loc, bw)| (Location::new(loc), bw))
            .collect();

        let period = raw
            .period_minutes
            .map(Duration::minutes)
            .unwrap_or(default.period);

        let start = match raw.start {
            Some(s) => parse_timestamp(&s)?,
            None => default.start,
        };
        let end = match raw.end {
            Some(s) => parse_timestamp(&s)?,
            None => default.end,
        };
        if end < start {
            return Err(SchedulerError::ConfigurationError("end must not precede start".into()));
        }

        Ok(Self {
            scenario,
            w_sla,
            w_energy,
            w_vm_rem,
            w_dcload,
            w_cost,
            utility_threshold: raw.utility_threshold.unwrap_or(default.utility_threshold),
            custom_weights,
            max_fc_horizon,
            fixed_bandwidth: raw.fixed_bandwidth.unwrap_or(default.fixed_bandwidth),
            bandwidth_map,
            period,
            start,
            end,
            forecast_periods: raw.forecast_periods.unwrap_or(default.forecast_periods),
            save_power: raw.save_power.unwrap_or(default.save_power),
            save_util: raw.save_util.unwrap_or(default.save_util),
            liveplot: raw.liveplot.unwrap_or(default.liveplot),
            fileplot: raw.fileplot.unwrap_or(default.fileplot),
            location_based: raw.location_based.unwrap_or(default.location_based),
            prices_in_mwh: raw.prices_in_mwh.unwrap_or(default.prices_in_mwh),
            alternate_cost_model: raw.alternate_cost_model.unwrap_or(default.alternate_cost_model),
        })
    }

    pub fn bandwidth_for(&self, loc: &Location) -> f64 {
        self.bandwidth_map.get(loc).copied().unwrap_or(self.fixed_bandwidth)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulerError::ConfigurationError(format!("malformed timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = SimulationConfig::new();
        assert_eq!(cfg.scenario, Scenario::RandomFitNoMigration);
        assert!(cfg.end > cfg.start);
    }

    #[test]
    fn from_raw_rejects_bad_scenario() {
        let raw = SimulationConfigRaw {
            scenario: Some(9),
            ..Default::default()
        };
        let err = SimulationConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, SchedulerError::ConfigurationError(_)));
    }

    #[test]
    fn from_raw_rejects_zero_weight_sum() {
        let raw = SimulationConfigRaw {
            w_sla: Some(0.0),
            w_energy: Some(0.0),
            w_vm_rem: Some(0.0),
            w_dcload: Some(0.0),
            w_cost: Some(0.0),
            ..Default::default()
        };
        let err = SimulationConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, SchedulerError::ConfigurationError(_)));
    }

    #[test]
    fn from_raw_honors_overrides() {
        let raw = SimulationConfigRaw {
            scenario: Some(5),
            max_fc_horizon: Some(12),
            ..Default::default()
        };
        let cfg = SimulationConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.scenario, Scenario::CheapestForecastUtilityForecast);
        assert_eq!(cfg.max_fc_horizon, 12);
    }
}

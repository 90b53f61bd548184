//! Planner configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What the balanced strategy does when the oracle fails for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleFailurePolicy {
    /// Fail the whole optimization call.
    #[default]
    Abort,
    /// Treat the vehicle as ineligible for that trip and keep going.
    SkipVehicle,
}

impl FromStr for OracleFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "abort" => Ok(Self::Abort),
            "skip_vehicle" => Ok(Self::SkipVehicle),
            other => Err(ConfigError::UnknownOracleFailurePolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Price per fuel unit.
    pub fuel_price: f64,
    /// Placeholder weather favorability handed to the oracle.
    pub weather_score: f64,
    /// How long a fetched traffic snapshot stays fresh.
    pub traffic_ttl: Duration,
    /// How long the latest optimization summary is kept.
    pub result_ttl: Duration,
    /// Wall-clock bound for one optimization call.
    pub timeout: Option<Duration>,
    pub oracle_failure: OracleFailurePolicy,
    /// Congestion level above which route suggestions carry a traffic alert.
    pub congestion_alert_threshold: f64,
    /// Maximum number of route records kept in the cached summary.
    pub max_summary_routes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fuel_price: 100.0,
            weather_score: 0.8,
            traffic_ttl: Duration::from_secs(300),
            result_ttl: Duration::from_secs(3600),
            timeout: None,
            oracle_failure: OracleFailurePolicy::Abort,
            congestion_alert_threshold: 0.7,
            max_summary_routes: 1000,
        }
    }
}

impl PlannerConfig {
    /// Reads `FLEET_PLANNER_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PlannerConfig::from_env`] with a custom variable source.
    ///
    /// Recognized keys: `FLEET_PLANNER_FUEL_PRICE`,
    /// `FLEET_PLANNER_WEATHER_SCORE`, `FLEET_PLANNER_TRAFFIC_TTL_SECS`,
    /// `FLEET_PLANNER_RESULT_TTL_SECS`, `FLEET_PLANNER_TIMEOUT_MS`,
    /// `FLEET_PLANNER_ORACLE_FAILURE` (`abort` | `skip_vehicle`),
    /// `FLEET_PLANNER_CONGESTION_ALERT`, `FLEET_PLANNER_MAX_SUMMARY_ROUTES`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(price) = parse(&lookup, "FLEET_PLANNER_FUEL_PRICE")? {
            config.fuel_price = price;
        }
        if let Some(score) = parse(&lookup, "FLEET_PLANNER_WEATHER_SCORE")? {
            config.weather_score = score;
        }
        if let Some(secs) = parse(&lookup, "FLEET_PLANNER_TRAFFIC_TTL_SECS")? {
            config.traffic_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "FLEET_PLANNER_RESULT_TTL_SECS")? {
            config.result_ttl = Duration::from_secs(secs);
        }
        if let Some(millis) = parse(&lookup, "FLEET_PLANNER_TIMEOUT_MS")? {
            config.timeout = Some(Duration::from_millis(millis));
        }
        if let Some(policy) = parse(&lookup, "FLEET_PLANNER_ORACLE_FAILURE")? {
            config.oracle_failure = policy;
        }
        if let Some(threshold) = parse(&lookup, "FLEET_PLANNER_CONGESTION_ALERT")? {
            config.congestion_alert_threshold = threshold;
        }
        if let Some(max) = parse(&lookup, "FLEET_PLANNER_MAX_SUMMARY_ROUTES")? {
            config.max_summary_routes = max;
        }

        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

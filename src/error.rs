//! Error taxonomy for the planner.
//!
//! Only validation failures, oracle outages and deadline expiry reach the
//! caller as hard errors. Traffic and cache failures are recovered locally.

use std::time::Duration;

use thiserror::Error;

/// Input rejected before any assignment work begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{owner} has coordinate ({latitude}, {longitude}) outside the valid range")]
    CoordinateOutOfRange {
        owner: String,
        latitude: f64,
        longitude: f64,
    },
    #[error("vehicle {0} must have a positive capacity")]
    NonPositiveCapacity(String),
    #[error("vehicle {0} must have a positive fuel efficiency")]
    NonPositiveFuelEfficiency(String),
    #[error("vehicle {0} must have a finite, non-negative max distance")]
    InvalidMaxDistance(String),
    #[error("trip {0} must have a positive weight")]
    NonPositiveWeight(String),
    #[error("trip {trip_id} has priority {priority}, expected 1..=5")]
    InvalidPriority { trip_id: String, priority: u8 },
    #[error("trip {0} has a time window that does not end after it starts")]
    InvertedTimeWindow(String),
    #[error("vehicle id {0} appears more than once")]
    DuplicateVehicleId(String),
    #[error("trip id {0} appears more than once")]
    DuplicateTripId(String),
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
    #[error("traffic snapshot has speed {average_speed} and congestion {congestion_level}")]
    InvalidTraffic {
        average_speed: f64,
        congestion_level: f64,
    },
}

/// Failure of a scoring oracle call.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("scoring oracle unavailable: {0}")]
    Unavailable(String),
    #[error("scoring oracle request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("scoring oracle returned a non-finite score {0}")]
    InvalidScore(f64),
}

/// Failure to fetch a traffic snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("traffic request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("traffic provider returned an invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("traffic provider unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the expiring key-value backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::planner::RoutePlanner`].
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("scoring trip {trip_id} for vehicle {vehicle_id} failed: {source}")]
    OracleUnavailable {
        vehicle_id: String,
        trip_id: String,
        #[source]
        source: OracleError,
    },
    #[error("optimization exceeded its time limit of {limit:?}")]
    Timeout { limit: Duration },
    #[error("could not start optimization worker: {0}")]
    Worker(#[source] std::io::Error),
}

/// Configuration could not be read from the environment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("unknown oracle failure policy {0:?}, expected abort or skip_vehicle")]
    UnknownOracleFailurePolicy(String),
}

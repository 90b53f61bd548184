//! Seams between the assignment core and its external collaborators.
//!
//! The core only depends on these traits. Concrete adapters (HTTP oracle,
//! HTTP traffic feed, in-memory cache) live in their own modules and any host
//! can swap in its own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{CacheError, OracleError, ProviderError};
use crate::models::TrafficSnapshot;
use crate::scoring::ScoringContext;

/// Pairwise distance between two (lat, lng) coordinates in kilometers.
pub trait GeoDistance: Send + Sync {
    fn distance_km(&self, from: (f64, f64), to: (f64, f64)) -> f64;
}

/// Produces a desirability score for assigning a trip to a vehicle.
///
/// Higher is better. Implementations may be called concurrently for different
/// vehicles of the same trip.
pub trait ScoringOracle: Send + Sync {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError>;
}

/// Source of live traffic conditions.
pub trait TrafficProvider: Send + Sync {
    fn fetch(&self) -> Result<TrafficSnapshot, ProviderError>;
}

/// Generic expiring key to JSON mapping. Best effort, never authoritative.
pub trait CacheStore: Send + Sync {
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Returns `None` for missing or expired keys.
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
}

/// Wall clock used for timestamps, expiry and time-of-day features.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T: ScoringOracle + ?Sized> ScoringOracle for Arc<T> {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        (**self).score(context)
    }
}

impl<T: TrafficProvider + ?Sized> TrafficProvider for Arc<T> {
    fn fetch(&self) -> Result<TrafficSnapshot, ProviderError> {
        (**self).fetch()
    }
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        (**self).get(key)
    }
}

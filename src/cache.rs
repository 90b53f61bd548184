//! Expiring key-value store and the optimization result cache built on it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{SystemClock, to_time_delta};
use crate::error::CacheError;
use crate::models::OptimizedRoute;
use crate::traits::{CacheStore, Clock};

/// Key the latest optimization summary is stored under.
pub const LATEST_OPTIMIZATION_KEY: &str = "latest_optimization";

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-process [`CacheStore`]. Expired entries are dropped on read.
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(to_time_delta(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries
            .lock()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Per-route record kept in the cached summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub vehicle_id: String,
    pub trip_count: usize,
    pub total_distance: f64,
    pub total_duration: f64,
    pub fuel_cost: f64,
    pub efficiency_score: f64,
}

impl From<&OptimizedRoute> for RouteSummary {
    fn from(route: &OptimizedRoute) -> Self {
        Self {
            vehicle_id: route.vehicle_id.clone(),
            trip_count: route.trips.len(),
            total_distance: route.total_distance,
            total_duration: route.total_duration,
            fuel_cost: route.fuel_cost,
            efficiency_score: route.efficiency_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub timestamp: DateTime<Utc>,
    pub routes: Vec<RouteSummary>,
}

/// Fleet-wide figures derived from the latest summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_routes: usize,
    /// Mean efficiency score; 0 when the summary has no routes.
    pub average_efficiency: f64,
    pub total_distance: f64,
    pub total_fuel_cost: f64,
    pub optimization_timestamp: DateTime<Utc>,
}

impl AggregateMetrics {
    pub fn from_summary(summary: &OptimizationSummary) -> Self {
        let total_routes = summary.routes.len();
        let efficiency_sum: f64 = summary.routes.iter().map(|r| r.efficiency_score).sum();
        let average_efficiency = if total_routes == 0 {
            0.0
        } else {
            efficiency_sum / total_routes as f64
        };

        Self {
            total_routes,
            average_efficiency,
            total_distance: summary.routes.iter().map(|r| r.total_distance).sum(),
            total_fuel_cost: summary.routes.iter().map(|r| r.fuel_cost).sum(),
            optimization_timestamp: summary.timestamp,
        }
    }
}

/// Keeps the latest optimization summary for a fixed time.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_routes: usize,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, max_routes: usize) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ttl,
            max_routes,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Writes a timestamped summary of `routes`.
    pub fn store(&self, routes: &[OptimizedRoute]) -> Result<(), CacheError> {
        self.store_summary(&self.summarize(routes))
    }

    /// Timestamped summary of `routes`, keeping at most `max_routes` records.
    pub fn summarize(&self, routes: &[OptimizedRoute]) -> OptimizationSummary {
        if routes.len() > self.max_routes {
            warn!(
                routes = routes.len(),
                kept = self.max_routes,
                "optimization summary truncated"
            );
        }

        OptimizationSummary {
            timestamp: self.clock.now(),
            routes: routes
                .iter()
                .take(self.max_routes)
                .map(RouteSummary::from)
                .collect(),
        }
    }

    pub fn store_summary(&self, summary: &OptimizationSummary) -> Result<(), CacheError> {
        let value = serde_json::to_value(summary)?;
        self.store.set(LATEST_OPTIMIZATION_KEY, value, self.ttl)
    }

    /// Latest unexpired summary, if any.
    pub fn latest(&self) -> Option<OptimizationSummary> {
        let value = match self.store.get(LATEST_OPTIMIZATION_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "result cache read failed");
                return None;
            }
        };

        let summary = match serde_json::from_value::<OptimizationSummary>(value) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "cached optimization summary is unreadable");
                return None;
            }
        };

        // The backing store is best effort; enforce the TTL here as well.
        if self.clock.now() - summary.timestamp >= to_time_delta(self.ttl) {
            debug!("cached optimization summary expired");
            return None;
        }

        Some(summary)
    }

    /// Aggregate over the latest summary; `None` means no data available.
    pub fn read_aggregate(&self) -> Option<AggregateMetrics> {
        self.latest().as_ref().map(AggregateMetrics::from_summary)
    }
}

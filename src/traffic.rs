//! Traffic snapshot providers.
//!
//! Fetch failures never abort an optimization: [`CachedTrafficProvider`]
//! falls back to [`TrafficSnapshot::fallback`] and logs the problem.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::SystemClock;
use crate::error::ProviderError;
use crate::models::TrafficSnapshot;
use crate::traits::{CacheStore, Clock, TrafficProvider};

/// Key the latest snapshot is cached under.
pub const TRAFFIC_CACHE_KEY: &str = "traffic_data";

/// Always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticTrafficProvider {
    snapshot: TrafficSnapshot,
}

impl StaticTrafficProvider {
    pub fn new(snapshot: TrafficSnapshot) -> Self {
        Self { snapshot }
    }
}

impl TrafficProvider for StaticTrafficProvider {
    fn fetch(&self) -> Result<TrafficSnapshot, ProviderError> {
        Ok(self.snapshot.clone())
    }
}

#[derive(Debug, Clone)]
pub struct HttpTrafficConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpTrafficConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Reads a snapshot from `GET {base_url}/traffic`.
#[derive(Debug, Clone)]
pub struct HttpTrafficProvider {
    config: HttpTrafficConfig,
    client: reqwest::blocking::Client,
}

impl HttpTrafficProvider {
    pub fn new(config: HttpTrafficConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl TrafficProvider for HttpTrafficProvider {
    fn fetch(&self) -> Result<TrafficSnapshot, ProviderError> {
        let url = format!("{}/traffic", self.config.base_url.trim_end_matches('/'));
        let snapshot = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<TrafficSnapshot>())?;

        if snapshot.is_valid() {
            Ok(snapshot)
        } else {
            Err(ProviderError::InvalidSnapshot(format!(
                "average_speed={} congestion_level={}",
                snapshot.average_speed, snapshot.congestion_level
            )))
        }
    }
}

/// Wraps a provider with a short-lived shared cache and the fallback snapshot.
#[derive(Clone)]
pub struct CachedTrafficProvider {
    inner: Arc<dyn TrafficProvider>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CachedTrafficProvider {
    pub fn new(inner: Arc<dyn TrafficProvider>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            inner,
            store,
            clock: Arc::new(SystemClock),
            ttl,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cached snapshot if still fresh, otherwise a new fetch. Never fails.
    pub fn snapshot(&self) -> TrafficSnapshot {
        if let Some(cached) = self.cached() {
            return cached;
        }

        match self.inner.fetch() {
            Ok(snapshot) if snapshot.is_valid() => {
                match serde_json::to_value(&snapshot) {
                    Ok(value) => {
                        if let Err(err) = self.store.set(TRAFFIC_CACHE_KEY, value, self.ttl) {
                            warn!(error = %err, "could not cache traffic snapshot");
                        }
                    }
                    Err(err) => warn!(error = %err, "could not encode traffic snapshot"),
                }
                snapshot
            }
            Ok(snapshot) => {
                warn!(
                    average_speed = snapshot.average_speed,
                    congestion = snapshot.congestion_level,
                    "traffic provider returned an invalid snapshot, using fallback"
                );
                TrafficSnapshot::fallback(self.clock.now())
            }
            Err(err) => {
                warn!(error = %err, "traffic fetch failed, using fallback");
                TrafficSnapshot::fallback(self.clock.now())
            }
        }
    }

    fn cached(&self) -> Option<TrafficSnapshot> {
        let value = match self.store.get(TRAFFIC_CACHE_KEY) {
            Ok(value) => value?,
            Err(err) => {
                warn!(error = %err, "traffic cache read failed");
                return None;
            }
        };

        match serde_json::from_value::<TrafficSnapshot>(value) {
            Ok(snapshot) if snapshot.is_valid() => {
                debug!("using cached traffic snapshot");
                Some(snapshot)
            }
            _ => None,
        }
    }
}

//! Test fixtures for fleet-planner.
//!
//! Provides:
//! - Real Las Vegas / Henderson locations for depots, pickups and deliveries
//! - Builders for vehicles and trips with sensible defaults
//! - Small oracle, traffic and cache doubles
//! - Seeded random workloads

#![allow(dead_code)]

pub mod las_vegas_locations;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use fleet_planner::error::{CacheError, OracleError, ProviderError};
use fleet_planner::models::{Location, TimeWindow, TrafficSnapshot, Trip, Vehicle};
use fleet_planner::scoring::{FeatureVector, ScoringContext};
use fleet_planner::traits::{CacheStore, ScoringOracle, TrafficProvider};

/// Monday 2024-03-04 08:00 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

pub fn hours(h: i64) -> TimeDelta {
    TimeDelta::hours(h)
}

// ============================================================================
// Vehicle / Trip builders
// ============================================================================

/// Builder for test vehicles with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestVehicle {
    vehicle: Vehicle,
}

impl TestVehicle {
    pub fn new(id: &str) -> Self {
        Self {
            vehicle: Vehicle {
                id: id.to_string(),
                capacity: 100.0,
                fuel_efficiency: 15.0,
                current_location: Location::new(0.0, 0.0),
                max_distance: 1000.0,
                driver_id: format!("driver-{}", id),
            },
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.vehicle.current_location = Location::new(lat, lng);
        self
    }

    pub fn located(mut self, location: Location) -> Self {
        self.vehicle.current_location = location;
        self
    }

    pub fn capacity(mut self, capacity: f64) -> Self {
        self.vehicle.capacity = capacity;
        self
    }

    pub fn fuel_efficiency(mut self, efficiency: f64) -> Self {
        self.vehicle.fuel_efficiency = efficiency;
        self
    }

    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

/// Builder for test trips with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestTrip {
    trip: Trip,
}

impl TestTrip {
    pub fn new(id: &str) -> Self {
        Self {
            trip: Trip {
                id: id.to_string(),
                pickup: Location::new(0.0, 0.1),
                delivery: Location::new(0.0, 0.2),
                weight: 10.0,
                priority: 3,
                time_window: TimeWindow::new(base_time(), base_time() + hours(8)),
                estimated_duration: None,
            },
        }
    }

    pub fn pickup(mut self, lat: f64, lng: f64) -> Self {
        self.trip.pickup = Location::new(lat, lng);
        self
    }

    pub fn delivery(mut self, lat: f64, lng: f64) -> Self {
        self.trip.delivery = Location::new(lat, lng);
        self
    }

    pub fn between(mut self, pickup: Location, delivery: Location) -> Self {
        self.trip.pickup = pickup;
        self.trip.delivery = delivery;
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.trip.weight = weight;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.trip.priority = priority;
        self
    }

    /// Window closing `h` hours after the base time.
    pub fn due_in_hours(mut self, h: i64) -> Self {
        self.trip.time_window = TimeWindow::new(base_time(), base_time() + hours(h));
        self
    }

    pub fn build(self) -> Trip {
        self.trip
    }
}

pub fn traffic(average_speed: f64, congestion_level: f64) -> TrafficSnapshot {
    TrafficSnapshot {
        timestamp: base_time(),
        average_speed,
        congestion_level,
        incidents: Vec::new(),
    }
}

// ============================================================================
// Oracle doubles
// ============================================================================

/// Same score for every pairing.
pub struct ConstantOracle(pub f64);

impl ScoringOracle for ConstantOracle {
    fn score(&self, _context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        Ok(self.0)
    }
}

/// Prefers vehicles with shorter routes, spreading trips round-robin.
pub struct ShortestRouteOracle;

impl ScoringOracle for ShortestRouteOracle {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        Ok(-(context.route.len() as f64))
    }
}

/// Fails for the listed vehicle ids, scores 1.0 otherwise.
pub struct FailingOracle {
    pub failing: Vec<String>,
}

impl FailingOracle {
    pub fn for_vehicles(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl ScoringOracle for FailingOracle {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        if self.failing.contains(&context.vehicle.id) {
            Err(OracleError::Unavailable("model server down".to_string()))
        } else {
            Ok(1.0)
        }
    }
}

/// One scoring request as seen by [`RecordingOracle`].
#[derive(Debug, Clone)]
pub struct ScoringCall {
    pub vehicle_id: String,
    pub trip_id: String,
    pub features: FeatureVector,
    pub route: Vec<String>,
    pub current_load: f64,
}

/// Records every scoring request it sees.
#[derive(Default)]
pub struct RecordingOracle {
    pub seen: Mutex<Vec<ScoringCall>>,
}

impl ScoringOracle for RecordingOracle {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        self.seen.lock().push(ScoringCall {
            vehicle_id: context.vehicle.id.clone(),
            trip_id: context.trip.id.clone(),
            features: context.features(),
            route: context.route_trips().map(|trip| trip.id.clone()).collect(),
            current_load: context.current_load,
        });
        Ok(0.0)
    }
}

/// Sleeps before answering.
pub struct SlowOracle(pub Duration);

impl ScoringOracle for SlowOracle {
    fn score(&self, _context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        std::thread::sleep(self.0);
        Ok(1.0)
    }
}

// ============================================================================
// Traffic / cache doubles
// ============================================================================

/// Counts fetches and returns a fixed snapshot, or an error when `fail` is set.
pub struct CountingTraffic {
    pub calls: AtomicUsize,
    pub snapshot: TrafficSnapshot,
    pub fail: bool,
}

impl CountingTraffic {
    pub fn returning(snapshot: TrafficSnapshot) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            snapshot,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            snapshot: traffic(40.0, 0.3),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TrafficProvider for CountingTraffic {
    fn fetch(&self) -> Result<TrafficSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ProviderError::Unavailable("feed offline".to_string()))
        } else {
            Ok(self.snapshot.clone())
        }
    }
}

/// A cache backend that is always down.
pub struct BrokenStore;

impl CacheStore for BrokenStore {
    fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// A working cache backend whose writes take `delay`.
pub struct SlowStore<S> {
    pub inner: S,
    pub delay: Duration,
}

impl<S: CacheStore> CacheStore for SlowStore<S> {
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        std::thread::sleep(self.delay);
        self.inner.set(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.inner.get(key)
    }
}

// ============================================================================
// Generated workloads
// ============================================================================

/// Vehicles and trips scattered around a small area.
pub fn random_workload(seed: u64, vehicles: usize, trips: usize) -> (Vec<Vehicle>, Vec<Trip>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let vehicles = (0..vehicles)
        .map(|i| {
            TestVehicle::new(&format!("v{}", i))
                .at(rng.gen_range(36.0..36.3), rng.gen_range(-115.3..-115.0))
                .capacity(rng.gen_range(40.0..120.0))
                .build()
        })
        .collect();
    let trips = (0..trips)
        .map(|i| {
            TestTrip::new(&format!("t{}", i))
                .pickup(rng.gen_range(36.0..36.3), rng.gen_range(-115.3..-115.0))
                .delivery(rng.gen_range(36.0..36.3), rng.gen_range(-115.3..-115.0))
                .weight(rng.gen_range(1.0..45.0))
                .priority(rng.gen_range(1..=5))
                .due_in_hours(rng.gen_range(1..=10))
                .build()
        })
        .collect();
    (vehicles, trips)
}

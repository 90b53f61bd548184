//! Request-scoped data model: locations, vehicles, trips, traffic and routes.
//!
//! Every type here is an immutable input or a derived output of one
//! optimization call. The engine decides which vehicle carries a trip and in
//! what order; it never alters the trip itself.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A geographic point with an optional display address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Coordinates as a (lat, lng) pair.
    pub fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Identity used by the distance matrix. The address is ignored.
    pub fn key(&self) -> LocationKey {
        LocationKey::new(self.latitude, self.longitude)
    }

    /// Whether both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    fn validate(&self, owner: impl FnOnce() -> String) -> Result<(), ValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationError::CoordinateOutOfRange {
                owner: owner(),
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Value-equality key for a coordinate pair.
///
/// Two locations share a key iff their latitude and longitude are bit-equal
/// (with `-0.0` folded into `0.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    latitude_bits: u64,
    longitude_bits: u64,
}

impl LocationKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude_bits: (latitude + 0.0).to_bits(),
            longitude_bits: (longitude + 0.0).to_bits(),
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (
            f64::from_bits(self.latitude_bits),
            f64::from_bits(self.longitude_bits),
        )
    }
}

impl From<&Location> for LocationKey {
    fn from(location: &Location) -> Self {
        location.key()
    }
}

/// A capacity- and range-constrained vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    /// Capacity in weight units.
    pub capacity: f64,
    /// Distance travelled per fuel unit.
    pub fuel_efficiency: f64,
    pub current_location: Location,
    pub max_distance: f64,
    pub driver_id: String,
}

impl Vehicle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.current_location
            .validate(|| format!("vehicle {}", self.id))?;
        if !(self.capacity > 0.0 && self.capacity.is_finite()) {
            return Err(ValidationError::NonPositiveCapacity(self.id.clone()));
        }
        if !(self.fuel_efficiency > 0.0 && self.fuel_efficiency.is_finite()) {
            return Err(ValidationError::NonPositiveFuelEfficiency(self.id.clone()));
        }
        if !(self.max_distance >= 0.0 && self.max_distance.is_finite()) {
            return Err(ValidationError::InvalidMaxDistance(self.id.clone()));
        }
        Ok(())
    }
}

/// Delivery time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// A single pickup-to-delivery task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub pickup: Location,
    pub delivery: Location,
    pub weight: f64,
    /// 1 is the most urgent, 5 the least.
    pub priority: u8,
    pub time_window: TimeWindow,
    /// Estimated duration in hours, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

impl Trip {
    pub const HIGHEST_PRIORITY: u8 = 1;
    pub const LOWEST_PRIORITY: u8 = 5;

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pickup
            .validate(|| format!("trip {} pickup", self.id))?;
        self.delivery
            .validate(|| format!("trip {} delivery", self.id))?;
        if !(self.weight > 0.0 && self.weight.is_finite()) {
            return Err(ValidationError::NonPositiveWeight(self.id.clone()));
        }
        if !(Self::HIGHEST_PRIORITY..=Self::LOWEST_PRIORITY).contains(&self.priority) {
            return Err(ValidationError::InvalidPriority {
                trip_id: self.id.clone(),
                priority: self.priority,
            });
        }
        if self.time_window.start >= self.time_window.end {
            return Err(ValidationError::InvertedTimeWindow(self.id.clone()));
        }
        Ok(())
    }
}

/// Validates a whole request. Nothing is processed if any entity is invalid.
pub fn validate_request(vehicles: &[Vehicle], trips: &[Trip]) -> Result<(), ValidationError> {
    let mut vehicle_ids = HashSet::with_capacity(vehicles.len());
    for vehicle in vehicles {
        vehicle.validate()?;
        if !vehicle_ids.insert(vehicle.id.as_str()) {
            return Err(ValidationError::DuplicateVehicleId(vehicle.id.clone()));
        }
    }

    let mut trip_ids = HashSet::with_capacity(trips.len());
    for trip in trips {
        trip.validate()?;
        if !trip_ids.insert(trip.id.as_str()) {
            return Err(ValidationError::DuplicateTripId(trip.id.clone()));
        }
    }

    Ok(())
}

/// Current traffic conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Average speed in km/h.
    pub average_speed: f64,
    /// Congestion level in [0, 1].
    pub congestion_level: f64,
    #[serde(default)]
    pub incidents: Vec<String>,
}

impl TrafficSnapshot {
    pub const FALLBACK_AVERAGE_SPEED: f64 = 40.0;
    pub const FALLBACK_CONGESTION: f64 = 0.3;

    /// Moderate conditions used when no provider data is available.
    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            average_speed: Self::FALLBACK_AVERAGE_SPEED,
            congestion_level: Self::FALLBACK_CONGESTION,
            incidents: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.average_speed.is_finite()
            && self.average_speed > 0.0
            && (0.0..=1.0).contains(&self.congestion_level)
    }
}

/// A vehicle's ordered trips together with derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub vehicle_id: String,
    pub trips: Vec<Trip>,
    pub total_distance: f64,
    /// Hours.
    pub total_duration: f64,
    pub fuel_cost: f64,
    pub efficiency_score: f64,
    /// Pickup then delivery for each trip, in assignment order.
    pub waypoints: Vec<Location>,
}

impl OptimizedRoute {
    pub fn empty(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            trips: Vec::new(),
            total_distance: 0.0,
            total_duration: 0.0,
            fuel_cost: 0.0,
            efficiency_score: 0.0,
            waypoints: Vec::new(),
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.trips.iter().map(|trip| trip.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
        )
    }

    fn vehicle(id: &str) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            capacity: 100.0,
            fuel_efficiency: 15.0,
            current_location: Location::new(36.1, -115.1),
            max_distance: 500.0,
            driver_id: "d1".to_string(),
        }
    }

    fn trip(id: &str) -> Trip {
        Trip {
            id: id.to_string(),
            pickup: Location::new(36.2, -115.2),
            delivery: Location::new(36.3, -115.3),
            weight: 10.0,
            priority: 3,
            time_window: window(),
            estimated_duration: None,
        }
    }

    #[test]
    fn test_location_key_ignores_address() {
        let a = Location::new(1.5, 2.5).with_address("Depot");
        let b = Location::new(1.5, 2.5);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().coords(), (1.5, 2.5));
    }

    #[test]
    fn test_location_key_folds_negative_zero() {
        assert_eq!(LocationKey::new(-0.0, 0.0), LocationKey::new(0.0, -0.0));
    }

    #[test]
    fn test_location_key_distinguishes_nearby_points() {
        assert_ne!(LocationKey::new(1.0, 2.0), LocationKey::new(1.0 + 1e-12, 2.0));
    }

    #[test]
    fn test_valid_request_passes() {
        assert_eq!(validate_request(&[vehicle("v1")], &[trip("t1")]), Ok(()));
    }

    #[test]
    fn test_rejects_out_of_range_coordinate() {
        let mut bad = trip("t1");
        bad.delivery = Location::new(91.0, 0.0);
        let err = validate_request(&[vehicle("v1")], &[bad]).unwrap_err();
        assert!(matches!(err, ValidationError::CoordinateOutOfRange { .. }));
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        let mut bad = vehicle("v1");
        bad.capacity = 0.0;
        assert_eq!(
            validate_request(&[bad], &[]),
            Err(ValidationError::NonPositiveCapacity("v1".to_string()))
        );
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        let mut bad = trip("t1");
        bad.weight = -1.0;
        assert_eq!(
            validate_request(&[], &[bad]),
            Err(ValidationError::NonPositiveWeight("t1".to_string()))
        );
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut bad = trip("t1");
        bad.time_window = TimeWindow::new(bad.time_window.end, bad.time_window.start);
        assert_eq!(
            validate_request(&[], &[bad]),
            Err(ValidationError::InvertedTimeWindow("t1".to_string()))
        );
    }

    #[test]
    fn test_rejects_priority_out_of_range() {
        let mut bad = trip("t1");
        bad.priority = 0;
        assert!(matches!(
            validate_request(&[], &[bad]),
            Err(ValidationError::InvalidPriority { priority: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        assert_eq!(
            validate_request(&[vehicle("v1"), vehicle("v1")], &[]),
            Err(ValidationError::DuplicateVehicleId("v1".to_string()))
        );
        assert_eq!(
            validate_request(&[], &[trip("t1"), trip("t1")]),
            Err(ValidationError::DuplicateTripId("t1".to_string()))
        );
    }

    #[test]
    fn test_fallback_snapshot() {
        let snapshot = TrafficSnapshot::fallback(Utc::now());
        assert_eq!(snapshot.average_speed, 40.0);
        assert_eq!(snapshot.congestion_level, 0.3);
        assert!(snapshot.incidents.is_empty());
        assert!(snapshot.is_valid());
    }

    #[test]
    fn test_trip_deserializes_without_estimated_duration() {
        let json = serde_json::json!({
            "id": "t1",
            "pickup": { "latitude": 1.0, "longitude": 2.0 },
            "delivery": { "latitude": 3.0, "longitude": 4.0, "address": "Dock 4" },
            "weight": 12.5,
            "priority": 2,
            "time_window": {
                "start": "2024-03-04T08:00:00Z",
                "end": "2024-03-04T12:00:00Z"
            }
        });
        let trip: Trip = serde_json::from_value(json).unwrap();
        assert_eq!(trip.estimated_duration, None);
        assert_eq!(trip.delivery.address.as_deref(), Some("Dock 4"));
        assert_eq!(trip.validate(), Ok(()));
    }
}

//! Route metrics: distance, duration, fuel cost and efficiency for one
//! vehicle's assigned trips.
//!
//! Only pickup-to-delivery legs are counted. The approach from the vehicle's
//! position to its first pickup, and the hops between consecutive trips, are
//! not part of the totals.

use crate::matrix::DistanceMatrix;
use crate::models::{OptimizedRoute, TrafficSnapshot, Trip, Vehicle};

/// Pure calculator; identical inputs always give identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMetricsCalculator {
    /// Price per fuel unit.
    pub fuel_price: f64,
}

impl RouteMetricsCalculator {
    pub fn new(fuel_price: f64) -> Self {
        Self { fuel_price }
    }

    /// Builds the route for `vehicle`, keeping the trips in the given order.
    pub fn calculate(
        &self,
        vehicle: &Vehicle,
        trips: Vec<Trip>,
        distances: &DistanceMatrix,
        traffic: &TrafficSnapshot,
    ) -> OptimizedRoute {
        if trips.is_empty() {
            return OptimizedRoute::empty(vehicle.id.clone());
        }

        let mut total_distance = 0.0;
        let mut total_duration = 0.0;
        let mut waypoints = Vec::with_capacity(trips.len() * 2);

        for trip in &trips {
            waypoints.push(trip.pickup.clone());
            waypoints.push(trip.delivery.clone());

            let leg = distances.distance_or_zero(&trip.pickup, &trip.delivery);
            total_distance += leg;
            total_duration += leg / traffic.average_speed;
        }

        let fuel_cost = total_distance / vehicle.fuel_efficiency * self.fuel_price;

        OptimizedRoute {
            vehicle_id: vehicle.id.clone(),
            trips,
            total_distance,
            total_duration,
            fuel_cost,
            efficiency_score: efficiency_score(total_distance, total_duration),
            waypoints,
        }
    }
}

/// Linear penalty model on a 0..=100 scale.
pub fn efficiency_score(total_distance: f64, total_duration: f64) -> f64 {
    (100.0 - total_distance * 0.5 - total_duration * 2.0).max(0.0)
}

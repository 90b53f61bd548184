//! Scoring oracles for the balanced strategy.
//!
//! An oracle sees a fixed-shape feature vector derived from the vehicle, the
//! candidate trip, the vehicle's route so far and current conditions. Two
//! implementations ship here: a closed-form heuristic and an HTTP adapter for
//! an external model server.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::matrix::DistanceMatrix;
use crate::models::{TrafficSnapshot, Trip, Vehicle};
use crate::traits::ScoringOracle;

/// Everything an oracle may look at when scoring one (vehicle, trip) pair.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub vehicle: &'a Vehicle,
    pub trip: &'a Trip,
    /// Every trip of the request; `route` indexes into it.
    pub trips: &'a [Trip],
    /// Indices of trips already committed to this vehicle, in order.
    pub route: &'a [usize],
    /// Total weight of the trips in `route`.
    pub current_load: f64,
    pub distances: &'a DistanceMatrix,
    pub traffic: &'a TrafficSnapshot,
    pub at: DateTime<Utc>,
    pub weather_score: f64,
}

impl<'a> ScoringContext<'a> {
    /// Trips already committed to this vehicle, in order.
    pub fn route_trips(&self) -> impl Iterator<Item = &'a Trip> + 'a {
        let (trips, route) = (self.trips, self.route);
        route.iter().map(move |&idx| &trips[idx])
    }

    /// Fraction of capacity used if the trip were added. May exceed 1.
    pub fn load_factor(&self) -> f64 {
        (self.current_load + self.trip.weight) / self.vehicle.capacity
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            distance: self
                .distances
                .distance(&self.vehicle.current_location, &self.trip.pickup),
            congestion: self.traffic.congestion_level,
            hour: self.at.hour(),
            weekday: self.at.weekday().num_days_from_monday(),
            weather_score: self.weather_score,
            fuel_efficiency: self.vehicle.fuel_efficiency,
            load_factor: self.load_factor(),
            priority: self.trip.priority,
        }
    }
}

/// Numeric features handed to an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Vehicle to pickup, kilometers.
    pub distance: f64,
    pub congestion: f64,
    /// Hour of day, 0..=23.
    pub hour: u32,
    /// Day of week, 0 = Monday.
    pub weekday: u32,
    pub weather_score: f64,
    pub fuel_efficiency: f64,
    pub load_factor: f64,
    pub priority: u8,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.distance,
            self.congestion,
            f64::from(self.hour),
            f64::from(self.weekday),
            self.weather_score,
            self.fuel_efficiency,
            self.load_factor,
            f64::from(self.priority),
        ]
    }
}

/// Deterministic closed-form oracle.
///
/// Scores on a 0..=100 scale: shorter approach, calmer traffic, better
/// weather, more efficient vehicles, lighter loads and more urgent trips all
/// score higher. Options that overload the vehicle score below zero, lower
/// the larger the overload, so they only win when nothing feasible exists.
#[derive(Debug, Clone)]
pub struct HeuristicOracle {
    /// Negative score per unit of load factor above 1. Must be positive.
    pub overload_penalty: f64,
}

impl Default for HeuristicOracle {
    fn default() -> Self {
        Self {
            overload_penalty: 100.0,
        }
    }
}

impl HeuristicOracle {
    pub fn new(overload_penalty: f64) -> Self {
        Self { overload_penalty }
    }

    pub fn score_features(&self, features: &FeatureVector) -> f64 {
        let overload = features.load_factor - 1.0;
        if overload > 0.0 {
            return -overload * self.overload_penalty;
        }

        let base = (100.0 - features.distance * 0.5)
            * features.weather_score
            * (1.0 - features.congestion * 0.3)
            * features.fuel_efficiency
            / 20.0
            * (1.0 - features.load_factor * 0.2)
            * (6.0 - f64::from(features.priority))
            / 5.0;
        if base.is_nan() { 0.0 } else { base.clamp(0.0, 100.0) }
    }
}

impl ScoringOracle for HeuristicOracle {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        Ok(self.score_features(&context.features()))
    }
}

#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpOracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Adapter to an external model server.
///
/// POSTs the [`FeatureVector`] as JSON to `{base_url}/score` and expects
/// `{"score": <number>}` back.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    config: HttpOracleConfig,
    client: reqwest::blocking::Client,
}

impl HttpOracle {
    pub fn new(config: HttpOracleConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!("{}/score", self.config.base_url.trim_end_matches('/'))
    }
}

impl ScoringOracle for HttpOracle {
    fn score(&self, context: &ScoringContext<'_>) -> Result<f64, OracleError> {
        let features = context.features();
        if !features.distance.is_finite() {
            return Err(OracleError::Unavailable(format!(
                "no distance from vehicle {} to trip {} pickup",
                context.vehicle.id, context.trip.id
            )));
        }

        let body = self
            .client
            .post(self.url())
            .json(&features)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<ScoreResponse>())?;

        if body.score.is_finite() {
            Ok(body.score)
        } else {
            Err(OracleError::InvalidScore(body.score))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

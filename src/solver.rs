//! Assignment engine: decides which vehicle carries each trip, and in what
//! order.
//!
//! Three interchangeable greedy strategies share one contract: every trip ends
//! up in at most one vehicle's list, and a trip nobody can legally take stays
//! unassigned. The outer loops are sequential because each commit must be
//! visible before the next decision; per-vehicle evaluation inside a step is
//! read-only and runs on rayon.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::OracleFailurePolicy;
use crate::deadline::Deadline;
use crate::error::{OracleError, PlannerError, ValidationError};
use crate::matrix::DistanceMatrix;
use crate::models::{TrafficSnapshot, Trip, Vehicle};
use crate::scoring::ScoringContext;
use crate::traits::ScoringOracle;

/// Cost added per weight unit a vehicle would be loaded beyond capacity.
pub const CAPACITY_PENALTY: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Nearest pickups first, hard capacity limit. Ignores traffic and priority.
    FuelEfficient,
    /// Most urgent trips first, each to the cheapest insertion.
    TimeOptimal,
    /// Each trip to the vehicle the scoring oracle likes best.
    #[default]
    Balanced,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::FuelEfficient => "fuel_efficient",
            Strategy::TimeOptimal => "time_optimal",
            Strategy::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fuel_efficient" => Ok(Strategy::FuelEfficient),
            "time_optimal" => Ok(Strategy::TimeOptimal),
            "balanced" => Ok(Strategy::Balanced),
            other => Err(ValidationError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Read-only inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentInput<'a> {
    pub vehicles: &'a [Vehicle],
    pub trips: &'a [Trip],
    pub distances: &'a DistanceMatrix,
    pub traffic: &'a TrafficSnapshot,
}

/// Knobs for the oracle-driven strategy.
#[derive(Debug, Clone)]
pub struct BalancedOptions {
    /// Moment used for the hour-of-day and day-of-week features.
    pub at: DateTime<Utc>,
    pub weather_score: f64,
    pub oracle_failure: OracleFailurePolicy,
}

/// Result of an assignment run: trip indices per vehicle, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    routes: Vec<Vec<usize>>,
    trip_count: usize,
}

impl Assignment {
    /// One entry per vehicle, holding indices into the trip slice.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    pub fn trips_for(&self, vehicle: usize) -> &[usize] {
        &self.routes[vehicle]
    }

    /// Indices of trips no vehicle took, in input order.
    pub fn unassigned(&self) -> Vec<usize> {
        let mut taken = vec![false; self.trip_count];
        for &trip in self.routes.iter().flatten() {
            taken[trip] = true;
        }
        taken
            .iter()
            .enumerate()
            .filter(|(_, taken)| !**taken)
            .map(|(trip, _)| trip)
            .collect()
    }
}

/// Mutable accumulator threaded through a strategy's sequential outer loop.
///
/// Parallel evaluations only ever see it through `&self`.
#[derive(Debug, Clone)]
pub struct AssignmentState {
    routes: Vec<Vec<usize>>,
    loads: Vec<f64>,
    assigned: Vec<bool>,
}

impl AssignmentState {
    pub fn new(vehicle_count: usize, trip_count: usize) -> Self {
        Self {
            routes: vec![Vec::new(); vehicle_count],
            loads: vec![0.0; vehicle_count],
            assigned: vec![false; trip_count],
        }
    }

    pub fn is_assigned(&self, trip: usize) -> bool {
        self.assigned[trip]
    }

    pub fn load(&self, vehicle: usize) -> f64 {
        self.loads[vehicle]
    }

    pub fn route(&self, vehicle: usize) -> &[usize] {
        &self.routes[vehicle]
    }

    /// Appends `trip` to `vehicle`'s route.
    pub fn commit(&mut self, vehicle: usize, trip: usize, weight: f64) {
        debug_assert!(!self.assigned[trip], "trip {} committed twice", trip);
        self.routes[vehicle].push(trip);
        self.loads[vehicle] += weight;
        self.assigned[trip] = true;
    }

    pub fn into_assignment(self) -> Assignment {
        Assignment {
            trip_count: self.assigned.len(),
            routes: self.routes,
        }
    }
}

/// Runs the selected strategy.
pub fn assign<O>(
    strategy: Strategy,
    input: &AssignmentInput<'_>,
    oracle: &O,
    options: &BalancedOptions,
    deadline: &Deadline,
) -> Result<Assignment, PlannerError>
where
    O: ScoringOracle + ?Sized,
{
    match strategy {
        Strategy::FuelEfficient => assign_fuel_efficient(input, deadline),
        Strategy::TimeOptimal => assign_time_optimal(input, deadline),
        Strategy::Balanced => assign_balanced(input, oracle, options, deadline),
    }
}

/// Each vehicle in turn claims the nearest unclaimed pickups that still fit.
///
/// Ties in distance keep input order. A pickup with no known distance is never
/// claimed.
pub fn assign_fuel_efficient(
    input: &AssignmentInput<'_>,
    deadline: &Deadline,
) -> Result<Assignment, PlannerError> {
    let AssignmentInput {
        vehicles,
        trips,
        distances,
        ..
    } = *input;
    let mut state = AssignmentState::new(vehicles.len(), trips.len());

    for (vehicle_idx, vehicle) in vehicles.iter().enumerate() {
        deadline.check()?;

        let mut ranked = trips
            .iter()
            .enumerate()
            .filter(|(trip_idx, _)| !state.is_assigned(*trip_idx))
            .map(|(trip_idx, trip)| {
                (distances.distance(&vehicle.current_location, &trip.pickup), trip_idx)
            })
            .filter(|(distance, _)| distance.is_finite())
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, trip_idx) in ranked {
            let weight = trips[trip_idx].weight;
            if state.load(vehicle_idx) + weight <= vehicle.capacity {
                state.commit(vehicle_idx, trip_idx, weight);
            }
        }

        debug!(
            vehicle = %vehicle.id,
            trips = state.route(vehicle_idx).len(),
            load = state.load(vehicle_idx),
            "fuel-efficient pass complete"
        );
    }

    Ok(state.into_assignment())
}

/// Approach distance plus a steep penalty for any capacity overage.
pub fn insertion_cost(
    vehicle: &Vehicle,
    trip: &Trip,
    current_load: f64,
    distances: &DistanceMatrix,
) -> f64 {
    let distance = distances.distance(&vehicle.current_location, &trip.pickup);
    let overage = (current_load + trip.weight - vehicle.capacity).max(0.0);
    distance + overage * CAPACITY_PENALTY
}

/// Trips in (priority, window end) order, each to the cheapest insertion.
///
/// Every trip is placed as long as there is at least one vehicle; when all
/// options overload, the smallest overage wins.
pub fn assign_time_optimal(
    input: &AssignmentInput<'_>,
    deadline: &Deadline,
) -> Result<Assignment, PlannerError> {
    let AssignmentInput {
        vehicles,
        trips,
        distances,
        ..
    } = *input;
    let mut state = AssignmentState::new(vehicles.len(), trips.len());

    let mut order = (0..trips.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        trips[a]
            .priority
            .cmp(&trips[b].priority)
            .then_with(|| trips[a].time_window.end.cmp(&trips[b].time_window.end))
    });

    for trip_idx in order {
        deadline.check()?;
        let trip = &trips[trip_idx];

        let costs = vehicles
            .par_iter()
            .enumerate()
            .map(|(vehicle_idx, vehicle)| {
                insertion_cost(vehicle, trip, state.load(vehicle_idx), distances)
            })
            .collect::<Vec<_>>();

        match first_min(&costs) {
            Some(vehicle_idx) => state.commit(vehicle_idx, trip_idx, trip.weight),
            None => debug!(trip = %trip.id, "no vehicle to take trip"),
        }
    }

    Ok(state.into_assignment())
}

/// Trips in input order, each to the vehicle with the highest oracle score.
///
/// No hard capacity check: the load factor is part of the oracle's input and
/// the oracle owns feasibility. Oracle failures follow
/// [`BalancedOptions::oracle_failure`].
pub fn assign_balanced<O>(
    input: &AssignmentInput<'_>,
    oracle: &O,
    options: &BalancedOptions,
    deadline: &Deadline,
) -> Result<Assignment, PlannerError>
where
    O: ScoringOracle + ?Sized,
{
    let AssignmentInput {
        vehicles,
        trips,
        distances,
        traffic,
    } = *input;
    let mut state = AssignmentState::new(vehicles.len(), trips.len());

    for (trip_idx, trip) in trips.iter().enumerate() {
        deadline.check()?;

        let scores = vehicles
            .par_iter()
            .enumerate()
            .map(|(vehicle_idx, vehicle)| {
                let context = ScoringContext {
                    vehicle,
                    trip,
                    trips,
                    route: state.route(vehicle_idx),
                    current_load: state.load(vehicle_idx),
                    distances,
                    traffic,
                    at: options.at,
                    weather_score: options.weather_score,
                };
                oracle.score(&context).and_then(|score| {
                    if score.is_nan() {
                        Err(OracleError::InvalidScore(score))
                    } else {
                        Ok(score)
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut best: Option<(usize, f64)> = None;
        for (vehicle_idx, result) in scores.into_iter().enumerate() {
            let score = match result {
                Ok(score) => score,
                Err(source) => match options.oracle_failure {
                    OracleFailurePolicy::Abort => {
                        error!(
                            vehicle = %vehicles[vehicle_idx].id,
                            trip = %trip.id,
                            error = %source,
                            "scoring failed, aborting optimization"
                        );
                        return Err(PlannerError::OracleUnavailable {
                            vehicle_id: vehicles[vehicle_idx].id.clone(),
                            trip_id: trip.id.clone(),
                            source,
                        });
                    }
                    OracleFailurePolicy::SkipVehicle => {
                        warn!(
                            vehicle = %vehicles[vehicle_idx].id,
                            trip = %trip.id,
                            error = %source,
                            "scoring failed, vehicle skipped for this trip"
                        );
                        continue;
                    }
                },
            };

            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((vehicle_idx, score));
            }
        }

        match best {
            Some((vehicle_idx, _)) => state.commit(vehicle_idx, trip_idx, trip.weight),
            None => debug!(trip = %trip.id, "no eligible vehicle for trip"),
        }
    }

    Ok(state.into_assignment())
}

/// Index of the smallest cost; the earliest index wins ties.
fn first_min(costs: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &cost) in costs.iter().enumerate() {
        if best.is_none_or(|(_, best_cost)| cost < best_cost) {
            best = Some((idx, cost));
        }
    }
    best.map(|(idx, _)| idx)
}

//! Planner entry point: validate, fetch traffic, build distances, assign,
//! compute metrics, cache the summary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{AggregateMetrics, OptimizationSummary, ResultCache};
use crate::clock::SystemClock;
use crate::config::PlannerConfig;
use crate::deadline::Deadline;
use crate::error::{PlannerError, ValidationError};
use crate::haversine::Haversine;
use crate::matrix::DistanceMatrix;
use crate::metrics::RouteMetricsCalculator;
use crate::models::{Location, OptimizedRoute, TrafficSnapshot, Trip, Vehicle, validate_request};
use crate::solver::{self, AssignmentInput, BalancedOptions, Strategy};
use crate::traffic::CachedTrafficProvider;
use crate::traits::{CacheStore, Clock, GeoDistance, ScoringOracle, TrafficProvider};

/// Alert attached to route suggestions under heavy congestion.
pub const HIGH_TRAFFIC_ALERT: &str = "High traffic detected. Consider alternative route.";

/// Everything one optimization call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub strategy: Strategy,
    /// One route per vehicle, in input order. Vehicles with no trips get an
    /// empty route.
    pub routes: Vec<OptimizedRoute>,
    /// Ids of trips no vehicle could take, in input order.
    pub unassigned: Vec<String>,
    /// Traffic conditions the call ran under.
    pub traffic: TrafficSnapshot,
    /// Fleet-wide figures for this run, as handed to the result cache.
    pub aggregate: AggregateMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSuggestions {
    pub vehicle_id: String,
    pub congestion_level: f64,
    pub traffic_alerts: Vec<String>,
    pub alternative_routes: Vec<Vec<Location>>,
    pub estimated_savings: BTreeMap<String, f64>,
}

pub struct RoutePlanner {
    pipeline: Pipeline,
    results: ResultCache,
    pending_write: Mutex<Option<JoinHandle<()>>>,
}

/// Everything `optimize` does after validation. Owns its collaborators so it
/// can move onto a worker thread.
#[derive(Clone)]
struct Pipeline {
    config: PlannerConfig,
    oracle: Arc<dyn ScoringOracle>,
    traffic: CachedTrafficProvider,
    geo: Arc<dyn GeoDistance>,
    clock: Arc<dyn Clock>,
}

struct Planned {
    routes: Vec<OptimizedRoute>,
    unassigned: Vec<String>,
    traffic: TrafficSnapshot,
}

impl RoutePlanner {
    /// Traffic snapshots and optimization summaries share `store`.
    pub fn new(
        config: PlannerConfig,
        oracle: Arc<dyn ScoringOracle>,
        traffic: Arc<dyn TrafficProvider>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            results: ResultCache::new(store.clone(), config.result_ttl, config.max_summary_routes)
                .with_clock(clock.clone()),
            pipeline: Pipeline {
                traffic: CachedTrafficProvider::new(traffic, store, config.traffic_ttl)
                    .with_clock(clock.clone()),
                config,
                oracle,
                geo: Arc::new(Haversine),
                clock,
            },
            pending_write: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.pipeline.traffic = self.pipeline.traffic.with_clock(clock.clone());
        self.results = self.results.with_clock(clock.clone());
        self.pipeline.clock = clock;
        self
    }

    /// Replaces the great-circle distance primitive.
    pub fn with_geo(mut self, geo: Arc<dyn GeoDistance>) -> Self {
        self.pipeline.geo = geo;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.pipeline.config
    }

    /// Assigns `trips` to `vehicles` using `strategy`.
    ///
    /// When `traffic` is `None` the cached or freshly fetched snapshot is used.
    /// Either every route is returned or the call fails. With a configured
    /// timeout the call returns `Timeout` once the limit passes, even while an
    /// oracle or traffic call is still blocked. The result cache is written in
    /// the background and a failed write is only logged.
    pub fn optimize(
        &self,
        vehicles: &[Vehicle],
        trips: &[Trip],
        strategy: Strategy,
        traffic: Option<TrafficSnapshot>,
    ) -> Result<OptimizationOutcome, PlannerError> {
        let deadline = Deadline::new(self.pipeline.config.timeout);
        info!(
            vehicles = vehicles.len(),
            trips = trips.len(),
            %strategy,
            "optimizing routes"
        );

        validate_request(vehicles, trips)?;
        if let Some(snapshot) = traffic.as_ref().filter(|snapshot| !snapshot.is_valid()) {
            return Err(ValidationError::InvalidTraffic {
                average_speed: snapshot.average_speed,
                congestion_level: snapshot.congestion_level,
            }
            .into());
        }

        let pipeline = self.pipeline.clone();
        let owned_vehicles = vehicles.to_vec();
        let owned_trips = trips.to_vec();
        let planned = deadline.run_bounded("fleet-planner-optimize", move || {
            pipeline.run(&owned_vehicles, &owned_trips, strategy, traffic, &deadline)
        })?;

        info!(
            routes = planned.routes.len(),
            assigned = trips.len() - planned.unassigned.len(),
            unassigned = planned.unassigned.len(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "optimization complete"
        );

        let summary = self.results.summarize(&planned.routes);
        let aggregate = AggregateMetrics::from_summary(&summary);
        self.write_in_background(summary);

        Ok(OptimizationOutcome {
            strategy,
            routes: planned.routes,
            unassigned: planned.unassigned,
            traffic: planned.traffic,
            aggregate,
        })
    }

    /// Metrics for the latest cached optimization; `None` when no data is
    /// available. Waits for an in-flight cache write first.
    pub fn aggregate_metrics(&self) -> Option<AggregateMetrics> {
        self.flush_pending_write();
        self.results.read_aggregate()
    }

    /// Hands the summary to a writer thread. Each writer joins its
    /// predecessor first so summaries land in call order.
    fn write_in_background(&self, summary: OptimizationSummary) {
        let mut pending = self.pending_write.lock();
        let previous = pending.take();
        let results = self.results.clone();
        let inline_copy = summary.clone();

        let spawned = thread::Builder::new()
            .name("fleet-planner-cache".to_string())
            .spawn(move || {
                if let Some(previous) = previous {
                    let _ = previous.join();
                }
                write_summary(&results, &summary);
            });

        match spawned {
            Ok(handle) => *pending = Some(handle),
            Err(err) => {
                warn!(error = %err, "could not start cache writer, writing inline");
                write_summary(&self.results, &inline_copy);
            }
        }
    }

    fn flush_pending_write(&self) {
        let handle = self.pending_write.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("cache writer panicked");
            }
        }
    }

    /// Live hints for one vehicle at `location`.
    pub fn route_suggestions(
        &self,
        vehicle_id: &str,
        location: &Location,
    ) -> Result<RouteSuggestions, PlannerError> {
        if !location.is_valid() {
            return Err(ValidationError::CoordinateOutOfRange {
                owner: format!("vehicle {}", vehicle_id),
                latitude: location.latitude,
                longitude: location.longitude,
            }
            .into());
        }

        let traffic = self.pipeline.traffic.snapshot();
        let mut traffic_alerts = Vec::new();
        if traffic.congestion_level > self.pipeline.config.congestion_alert_threshold {
            traffic_alerts.push(HIGH_TRAFFIC_ALERT.to_string());
        }

        Ok(RouteSuggestions {
            vehicle_id: vehicle_id.to_string(),
            congestion_level: traffic.congestion_level,
            traffic_alerts,
            alternative_routes: Vec::new(),
            estimated_savings: BTreeMap::new(),
        })
    }
}

impl Pipeline {
    fn run(
        &self,
        vehicles: &[Vehicle],
        trips: &[Trip],
        strategy: Strategy,
        traffic: Option<TrafficSnapshot>,
        deadline: &Deadline,
    ) -> Result<Planned, PlannerError> {
        let traffic = match traffic {
            Some(snapshot) => snapshot,
            None => self.traffic.snapshot(),
        };
        deadline.check()?;

        let distances = DistanceMatrix::build_with(self.geo.as_ref(), vehicles, trips);
        deadline.check()?;

        let input = AssignmentInput {
            vehicles,
            trips,
            distances: &distances,
            traffic: &traffic,
        };
        let options = BalancedOptions {
            at: self.clock.now(),
            weather_score: self.config.weather_score,
            oracle_failure: self.config.oracle_failure,
        };
        let assignment = solver::assign(strategy, &input, self.oracle.as_ref(), &options, deadline)?;
        deadline.check()?;

        let calculator = RouteMetricsCalculator::new(self.config.fuel_price);
        let routes = vehicles
            .iter()
            .zip(assignment.routes())
            .map(|(vehicle, indices)| {
                let assigned = indices.iter().map(|&idx| trips[idx].clone()).collect();
                calculator.calculate(vehicle, assigned, &distances, &traffic)
            })
            .collect();

        let unassigned = assignment
            .unassigned()
            .into_iter()
            .map(|idx| trips[idx].id.clone())
            .collect();

        Ok(Planned {
            routes,
            unassigned,
            traffic,
        })
    }
}

fn write_summary(results: &ResultCache, summary: &OptimizationSummary) {
    if let Err(err) = results.store_summary(summary) {
        warn!(error = %err, "could not cache optimization results");
    }
}

//! All-pairs distance table for one optimization call.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::haversine::Haversine;
use crate::models::{Location, LocationKey, Trip, Vehicle};
use crate::traits::GeoDistance;

/// Distances in kilometers between every location referenced by a request.
///
/// Locations are deduplicated by [`LocationKey`], so repeated coordinates are
/// computed once. Storage is a dense row-major `n * n` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    index: HashMap<LocationKey, usize>,
    locations: Vec<LocationKey>,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds the matrix using great-circle distances.
    pub fn build(vehicles: &[Vehicle], trips: &[Trip]) -> Self {
        Self::build_with(&Haversine, vehicles, trips)
    }

    /// Builds the matrix using the given distance primitive.
    ///
    /// Each unordered pair is computed once (in parallel) and mirrored.
    /// Negative or NaN distances from the primitive are clamped to zero.
    pub fn build_with<G>(geo: &G, vehicles: &[Vehicle], trips: &[Trip]) -> Self
    where
        G: GeoDistance + ?Sized,
    {
        let locations = collect_locations(vehicles, trips);
        let index = locations
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i))
            .collect::<HashMap<_, _>>();

        let n = locations.len();
        let pairs = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let locations = &locations;
                (i + 1..n).map(move |j| {
                    let km = geo.distance_km(locations[i].coords(), locations[j].coords());
                    (i, j, km.max(0.0))
                })
            })
            .collect::<Vec<_>>();

        let mut data = vec![0.0; n * n];
        for (i, j, km) in pairs {
            data[i * n + j] = km;
            data[j * n + i] = km;
        }

        Self {
            index,
            locations,
            data,
        }
    }

    /// Distance between two keys, or `None` if either is not in the matrix.
    pub fn get(&self, from: LocationKey, to: LocationKey) -> Option<f64> {
        let i = *self.index.get(&from)?;
        let j = *self.index.get(&to)?;
        Some(self.data[i * self.locations.len() + j])
    }

    /// Distance used for assignment decisions. Unknown pairs are infinitely
    /// far so any comparison rejects them.
    pub fn distance(&self, from: &Location, to: &Location) -> f64 {
        self.get(from.key(), to.key()).unwrap_or(f64::INFINITY)
    }

    /// Distance used for route metrics. Unknown pairs contribute nothing.
    pub fn distance_or_zero(&self, from: &Location, to: &Location) -> f64 {
        self.get(from.key(), to.key()).unwrap_or(0.0)
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.index.contains_key(&location.key())
    }

    /// Deduplicated locations in first-seen order.
    pub fn locations(&self) -> &[LocationKey] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Vehicle positions first, then each trip's pickup and delivery, deduplicated.
fn collect_locations(vehicles: &[Vehicle], trips: &[Trip]) -> Vec<LocationKey> {
    let candidates = vehicles
        .iter()
        .map(|vehicle| vehicle.current_location.key())
        .chain(
            trips
                .iter()
                .flat_map(|trip| [trip.pickup.key(), trip.delivery.key()]),
        );

    let mut seen = std::collections::HashSet::new();
    candidates.filter(|key| seen.insert(*key)).collect()
}

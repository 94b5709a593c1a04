//! Stop sequencing for multi-drop routes.
//!
//! Ordering is built with the nearest-neighbor heuristic and can be refined
//! with 2-opt segment reversals. Neither step looks at the optional end
//! point: it only contributes a closing leg to [`RouteOptimizer::total_route_distance`].
//!
//! Complexity is O(n²) for nearest-neighbor and O(n³) per 2-opt pass, so the
//! refinement is only applied below [`RouteOptimizer::two_opt_max_stops`].

use crate::models::{Coordinates, Location};
use crate::services::distance::DistanceCalculator;

#[derive(Debug, Clone)]
pub struct RouteOptimizer {
    distance: DistanceCalculator,
    two_opt_max_stops: usize,
}

impl RouteOptimizer {
    pub fn new(distance: DistanceCalculator, two_opt_max_stops: usize) -> Self {
        RouteOptimizer {
            distance,
            two_opt_max_stops,
        }
    }

    pub fn two_opt_max_stops(&self) -> usize {
        self.two_opt_max_stops
    }

    /// Order `destinations` with the nearest-neighbor heuristic, starting at `start`.
    ///
    /// `end` is accepted for symmetry with [`Self::total_route_distance`] but does
    /// not influence the order.
    pub fn optimize(
        &self,
        start: &Location,
        destinations: &[Location],
        _end: Option<&Location>,
    ) -> Vec<Location> {
        if destinations.is_empty() {
            tracing::debug!("No destinations to optimize");
            return Vec::new();
        }

        tracing::debug!("Optimizing route for {} destinations", destinations.len());
        self.nearest_neighbor(start, destinations.to_vec())
    }

    /// Nearest-neighbor ordering followed by 2-opt when the stop count is below
    /// the configured cap
    pub fn optimize_and_improve(
        &self,
        start: &Location,
        destinations: &[Location],
        end: Option<&Location>,
    ) -> Vec<Location> {
        let ordered = self.optimize(start, destinations, end);

        if ordered.len() < self.two_opt_max_stops {
            self.two_opt_improve(start, &ordered)
        } else {
            tracing::debug!(
                stops = ordered.len(),
                cap = self.two_opt_max_stops,
                "Skipping 2-opt refinement, keeping nearest-neighbor order"
            );
            ordered
        }
    }

    fn nearest_neighbor(&self, start: &Location, mut unvisited: Vec<Location>) -> Vec<Location> {
        let mut ordered = Vec::with_capacity(unvisited.len());
        let mut current = start.coordinates;

        while !unvisited.is_empty() {
            let nearest = self.nearest_index(&current, &unvisited);
            let next = unvisited.remove(nearest);
            current = next.coordinates;
            ordered.push(next);
        }

        tracing::debug!("Route optimized with {} stops", ordered.len());
        ordered
    }

    /// Index of the closest candidate; the first one wins on ties.
    /// `candidates` must not be empty.
    fn nearest_index(&self, from: &Coordinates, candidates: &[Location]) -> usize {
        let mut best_index = 0;
        let mut best_distance = f64::MAX;

        for (i, candidate) in candidates.iter().enumerate() {
            let d = self.distance.distance(from, &candidate.coordinates);
            if d < best_distance {
                best_distance = d;
                best_index = i;
            }
        }

        best_index
    }

    /// Distance of `start -> stops[0] -> ... -> stops[last]`, plus the leg to `end` if given
    pub fn total_route_distance(
        &self,
        start: &Location,
        stops: &[Location],
        end: Option<&Location>,
    ) -> f64 {
        let mut total = 0.0;
        let mut current = &start.coordinates;

        for stop in stops {
            total += self.distance.distance(current, &stop.coordinates);
            current = &stop.coordinates;
        }

        if let Some(end) = end {
            total += self.distance.distance(current, &end.coordinates);
        }

        total
    }

    /// 2-opt local search: keep reversing segments `[i, j]` while that
    /// strictly shortens the open path from `start`. Stops after a full
    /// pass without improvement.
    pub fn two_opt_improve(&self, start: &Location, route: &[Location]) -> Vec<Location> {
        let mut best = route.to_vec();
        if best.len() < 2 {
            return best;
        }

        let mut improved = true;
        let mut passes = 0usize;

        while improved {
            improved = false;
            passes += 1;
            let mut best_distance = self.total_route_distance(start, &best, None);

            for i in 0..best.len() - 1 {
                for j in i + 1..best.len() {
                    let mut candidate = best.clone();
                    candidate[i..=j].reverse();
                    let candidate_distance = self.total_route_distance(start, &candidate, None);

                    if candidate_distance < best_distance {
                        best = candidate;
                        best_distance = candidate_distance;
                        improved = true;
                    }
                }
            }
        }

        tracing::debug!("2-opt optimization completed after {} passes", passes);
        best
    }
}

use crate::cache::{CacheFence, CacheStats, RouteCache};
use crate::config::{PricingConfig, RoutingConfig};
use crate::db::RouteRepository;
use crate::error::{AppError, Result};
use crate::models::route::{OptimizeRouteRequest, RouteCalculationRequest};
use crate::models::{
    timestamp_now, CalculationPolicy, Location, NewRoute, OptimizedRoute, Route, RouteStatistics,
    RouteStatus, Step,
};
use crate::services::distance::{round2, DistanceCalculator};
use crate::services::pricing::PricingCalculator;
use crate::services::route_optimizer::RouteOptimizer;
use serde::Serialize;
use std::sync::Arc;

/// Orchestrates route calculation, stop optimization and the stored route
/// lifecycle on top of a [`RouteRepository`] and an optional [`RouteCache`].
pub struct RouteService {
    repository: Arc<dyn RouteRepository>,
    cache: Option<Arc<dyn RouteCache>>,
    fence: CacheFence,
    distance: DistanceCalculator,
    pricing: PricingCalculator,
    optimizer: RouteOptimizer,
    routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub healthy: bool,
    pub stats: CacheStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub repository: &'static str,
    pub repository_healthy: bool,
    pub cache: Option<CacheHealth>,
}

impl RouteService {
    pub fn new(
        repository: Arc<dyn RouteRepository>,
        routing: RoutingConfig,
        pricing: PricingConfig,
        cache: Option<Arc<dyn RouteCache>>,
    ) -> Self {
        let distance = DistanceCalculator::new();
        RouteService {
            repository,
            cache,
            fence: CacheFence::new(),
            distance,
            pricing: PricingCalculator::new(pricing),
            optimizer: RouteOptimizer::new(distance, routing.two_opt_max_stops),
            routing,
        }
    }

    pub fn routing_config(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Leg duration in whole minutes at the configured average speed (floored)
    fn minutes_for(&self, distance_km: f64) -> u32 {
        ((distance_km / self.routing.average_speed_kmh) * 60.0).floor() as u32
    }

    /// Compute, price and store a route from origin to destination.
    ///
    /// The maximum distance is checked against the direct origin to
    /// destination distance, before any stop is considered. Steps are only
    /// produced when intermediate stops are given.
    pub async fn calculate_route(&self, request: RouteCalculationRequest) -> Result<Route> {
        request.validate().map_err(AppError::InvalidCoordinate)?;

        let origin = &request.origin.coordinates;
        let destination = &request.destination.coordinates;
        tracing::info!(
            "Calculating route from ({}, {}) to ({}, {})",
            origin.lat,
            origin.lng,
            destination.lat,
            destination.lng
        );

        let direct_distance = self.distance.distance(origin, destination);
        if direct_distance.is_nan() || direct_distance > self.routing.max_distance_km {
            return Err(AppError::RouteTooLong {
                distance_km: direct_distance,
                max_distance_km: self.routing.max_distance_km,
            });
        }

        let stops = if request.optimize_stops && !request.intermediate_stops.is_empty() {
            self.optimizer.optimize_and_improve(
                &request.origin,
                &request.intermediate_stops,
                Some(&request.destination),
            )
        } else {
            request.intermediate_stops.clone()
        };

        let steps = self.build_steps(&request.origin, &stops, &request.destination);
        let distance_km = if steps.is_empty() {
            direct_distance
        } else {
            round2(steps.iter().map(|s| s.distance_from_previous_km).sum())
        };

        let policy = request.policy.unwrap_or_default();
        let new_route = NewRoute {
            delivery_id: request.delivery_id,
            policy,
            status: RouteStatus::Calculated,
            origin: request.origin,
            destination: request.destination,
            distance_km,
            duration_minutes: self.minutes_for(distance_km),
            estimated_cost: self.pricing.cost(distance_km, policy),
            fuel_cost: self.pricing.fuel_cost(distance_km),
            co2_emissions_kg: self.pricing.co2_emissions(distance_km),
            average_speed_kmh: self.routing.average_speed_kmh,
            steps,
            calculated_at: timestamp_now(),
            notes: request.notes,
        };

        let seen = self.fence.generation().await;
        let route = self.repository.save(new_route).await?;
        tracing::info!(
            "Route calculated with ID: {} ({} km, {} min, {} steps)",
            route.id,
            route.distance_km,
            route.duration_minutes,
            route.steps.len()
        );

        if let Some(ref cache) = self.cache {
            self.fence.fill(cache.as_ref(), &route, seen).await;
        }

        Ok(route)
    }

    /// Steps origin -> stops -> destination, numbered from 1. Empty without stops.
    fn build_steps(&self, origin: &Location, stops: &[Location], destination: &Location) -> Vec<Step> {
        if stops.is_empty() {
            return Vec::new();
        }

        let mut steps = Vec::with_capacity(stops.len() + 2);
        steps.push(Step {
            order: 1,
            location: origin.clone(),
            distance_from_previous_km: 0.0,
            duration_from_previous_minutes: 0,
            instructions: Some(format!("Depart from {}", describe(origin))),
        });

        let mut previous = origin;
        for (i, stop) in stops.iter().chain(std::iter::once(destination)).enumerate() {
            let leg = self.distance.distance(&previous.coordinates, &stop.coordinates);
            let instructions = if i == stops.len() {
                format!("Arrive at {}", describe(stop))
            } else {
                format!("Continue to {}", describe(stop))
            };

            steps.push(Step {
                order: steps.len() as u32 + 1,
                location: stop.clone(),
                distance_from_previous_km: leg,
                duration_from_previous_minutes: self.minutes_for(leg),
                instructions: Some(instructions),
            });
            previous = stop;
        }

        steps
    }

    /// Order destinations for a multi-drop tour. Nothing is stored.
    pub async fn optimize_route(&self, request: OptimizeRouteRequest) -> Result<OptimizedRoute> {
        request.validate().map_err(AppError::InvalidCoordinate)?;
        tracing::info!(
            "Optimizing route with {} destinations",
            request.destinations.len()
        );

        let ordered_stops = self.optimizer.optimize_and_improve(
            &request.start,
            &request.destinations,
            request.end.as_ref(),
        );

        let mut total_distance = 0.0;
        let mut total_duration = 0u32;
        let mut previous = &request.start;
        for stop in ordered_stops.iter().chain(request.end.iter()) {
            let leg = self.distance.distance(&previous.coordinates, &stop.coordinates);
            total_distance += leg;
            total_duration += self.minutes_for(leg);
            previous = stop;
        }

        let total_distance_km = round2(total_distance);
        let total_cost = self
            .pricing
            .cost(total_distance_km, CalculationPolicy::ShortestDistance);
        let description = format!(
            "Optimized route for {} destination(s). Total distance: {:.2} km, estimated duration: {} minutes",
            ordered_stops.len(),
            total_distance_km,
            total_duration
        );

        tracing::info!(
            "Route optimization completed - Distance: {} km, Duration: {} min",
            total_distance_km,
            total_duration
        );

        Ok(OptimizedRoute {
            ordered_stops,
            total_distance_km,
            total_duration_minutes: total_duration,
            total_cost,
            description,
        })
    }

    pub async fn get_route_by_id(&self, id: i64) -> Result<Route> {
        if let Some(ref cache) = self.cache {
            if let Some(route) = cache.get_route(id).await {
                return Ok(route);
            }
        }

        tracing::info!("Fetching route with ID: {}", id);
        let seen = self.fence.generation().await;
        let route = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        if let Some(ref cache) = self.cache {
            self.fence.fill(cache.as_ref(), &route, seen).await;
        }

        Ok(route)
    }

    pub async fn get_route_by_delivery_id(&self, delivery_id: i64) -> Result<Route> {
        tracing::info!("Fetching route for delivery: {}", delivery_id);
        self.repository
            .find_by_delivery_id(delivery_id)
            .await?
            .ok_or_else(|| {
                AppError::RouteNotFound(format!("Route not found for delivery: {}", delivery_id))
            })
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        tracing::info!("Fetching all routes");
        self.repository.find_all().await
    }

    pub async fn list_routes_by_status(&self, status: RouteStatus) -> Result<Vec<Route>> {
        tracing::info!("Fetching routes with status: {}", status);
        self.repository.find_by_status(status).await
    }

    pub async fn update_route_status(&self, id: i64, status: RouteStatus) -> Result<Route> {
        tracing::info!("Updating route {} status to {}", id, status);

        if self.routing.strict_status_transitions {
            let current = self
                .repository
                .find_by_id(id)
                .await?
                .ok_or_else(|| not_found(id))?;

            if !current.status.can_transition_to(status) {
                return Err(AppError::InvalidStatusTransition {
                    from: current.status,
                    to: status,
                });
            }
        }

        let route = self
            .repository
            .update_status(id, status)
            .await?
            .ok_or_else(|| not_found(id))?;

        if let Some(ref cache) = self.cache {
            self.fence.invalidate(cache.as_ref(), id).await;
        }

        Ok(route)
    }

    pub async fn delete_route(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting route with ID: {}", id);

        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }

        if let Some(ref cache) = self.cache {
            self.fence.invalidate(cache.as_ref(), id).await;
        }

        Ok(())
    }

    pub async fn statistics(&self) -> Result<RouteStatistics> {
        self.repository.statistics().await
    }

    pub async fn health_check(&self) -> HealthReport {
        let repository_healthy = self.repository.health_check().await;

        let cache = match self.cache {
            Some(ref cache) => Some(CacheHealth {
                backend: cache.backend_name(),
                healthy: cache.health_check().await,
                stats: cache.get_stats().await,
            }),
            None => None,
        };

        let cache_healthy = cache.as_ref().map_or(true, |c| c.healthy);
        let status = if repository_healthy && cache_healthy {
            "ok"
        } else {
            "degraded"
        };

        HealthReport {
            status,
            repository: self.repository.backend_name(),
            repository_healthy,
            cache,
        }
    }
}

fn not_found(id: i64) -> AppError {
    AppError::RouteNotFound(format!("Route not found with ID: {}", id))
}

fn describe(location: &Location) -> String {
    match location.label() {
        Some(label) => label.to_string(),
        None => format!(
            "({:.5}, {:.5})",
            location.coordinates.lat, location.coordinates.lng
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheService;
    use crate::db::MemoryRouteRepository;
    use crate::models::Coordinates;

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(Coordinates::new(lat, lng).unwrap())
    }

    fn service_with(routing: RoutingConfig) -> RouteService {
        RouteService::new(
            Arc::new(MemoryRouteRepository::new()),
            routing,
            PricingConfig::default(),
            Some(Arc::new(MemoryCacheService::new(3600, 100))),
        )
    }

    fn service() -> RouteService {
        service_with(RoutingConfig::default())
    }

    #[test]
    fn test_minutes_are_floored() {
        let service = service();
        // 85.2 km at 50 km/h = 102.24 minutes
        assert_eq!(service.minutes_for(85.2), 102);
        assert_eq!(service.minutes_for(0.0), 0);
        assert_eq!(service.minutes_for(0.83), 0);
    }

    #[tokio::test]
    async fn test_direct_route_has_no_steps() {
        let service = service();
        let request = RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0));

        let route = service.calculate_route(request).await.unwrap();
        assert!(route.steps.is_empty());
        assert_eq!(route.distance_km, 111.19);
        assert_eq!(route.duration_minutes, 133);
        assert_eq!(route.policy, CalculationPolicy::ShortestDistance);
        assert_eq!(route.status, RouteStatus::Calculated);
        assert_eq!(route.estimated_cost, round2(111.19 * 2.5));
    }

    #[tokio::test]
    async fn test_timestamps_match_stored_precision() {
        let service = service();
        let route = service
            .calculate_route(RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0)))
            .await
            .unwrap();
        assert_eq!(route.calculated_at.nanosecond() % 1_000, 0);
        assert_eq!(route.updated_at, route.calculated_at);

        let updated = service
            .update_route_status(route.id, RouteStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(updated.updated_at.nanosecond() % 1_000, 0);
        assert_eq!(updated.calculated_at, route.calculated_at);
    }

    #[tokio::test]
    async fn test_steps_follow_input_order() {
        let service = service();
        let mut request = RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 3.0));
        request.intermediate_stops = vec![loc(0.0, 2.0), loc(0.0, 1.0)];

        let route = service.calculate_route(request).await.unwrap();
        let orders: Vec<u32> = route.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(route.steps[1].location, loc(0.0, 2.0));
        assert_eq!(route.steps[2].location, loc(0.0, 1.0));
        assert_eq!(route.steps[0].distance_from_previous_km, 0.0);

        let leg_sum: f64 = route.steps.iter().map(|s| s.distance_from_previous_km).sum();
        assert_eq!(route.distance_km, round2(leg_sum));
    }

    #[tokio::test]
    async fn test_optimize_stops_flag_reorders() {
        let service = service();
        let mut request = RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 3.0));
        request.intermediate_stops = vec![loc(0.0, 2.0), loc(0.0, 1.0)];
        request.optimize_stops = true;

        let route = service.calculate_route(request).await.unwrap();
        assert_eq!(route.steps[1].location, loc(0.0, 1.0));
        assert_eq!(route.steps[2].location, loc(0.0, 2.0));
        assert_eq!(
            route.steps[3].instructions.as_deref(),
            Some("Arrive at (0.00000, 3.00000)")
        );
    }

    #[tokio::test]
    async fn test_invalid_coordinate_is_rejected() {
        let service = service();
        let mut request = RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0));
        request.destination.coordinates.lat = 91.0;

        let err = service.calculate_route(request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCoordinate(ref m) if m.starts_with("destination")));
    }

    #[tokio::test]
    async fn test_route_too_long_is_not_saved() {
        let service = service();
        // Paris -> Madrid is over 1000 km
        let request = RouteCalculationRequest::new(loc(48.8566, 2.3522), loc(40.4168, -3.7038));

        let err = service.calculate_route(request).await.unwrap_err();
        assert!(matches!(err, AppError::RouteTooLong { .. }));
        assert!(service.list_routes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_antipodal_route_is_too_long() {
        let service = service();
        let request = RouteCalculationRequest::new(loc(-60.07, -179.0), loc(60.07, 1.0));

        match service.calculate_route(request).await.unwrap_err() {
            AppError::RouteTooLong {
                distance_km,
                max_distance_km,
            } => {
                assert!((distance_km - 20015.09).abs() < 0.1, "got {}", distance_km);
                assert_eq!(max_distance_km, 500.0);
            }
            other => panic!("expected RouteTooLong, got {:?}", other),
        }
        assert!(service.list_routes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_route_uses_cache_and_reports_missing() {
        let service = service();
        let route = service
            .calculate_route(RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0)))
            .await
            .unwrap();

        assert_eq!(service.get_route_by_id(route.id).await.unwrap(), route);

        let err = service.get_route_by_id(42).await.unwrap_err();
        assert_eq!(err.to_string(), "Route not found with ID: 42");
    }

    #[tokio::test]
    async fn test_status_update_invalidates_cache() {
        let service = service();
        let route = service
            .calculate_route(RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0)))
            .await
            .unwrap();

        service
            .update_route_status(route.id, RouteStatus::Completed)
            .await
            .unwrap();

        let fetched = service.get_route_by_id(route.id).await.unwrap();
        assert_eq!(fetched.status, RouteStatus::Completed);
    }

    #[tokio::test]
    async fn test_strict_transitions() {
        let service = service_with(RoutingConfig {
            strict_status_transitions: true,
            ..Default::default()
        });
        let route = service
            .calculate_route(RouteCalculationRequest::new(loc(0.0, 0.0), loc(0.0, 1.0)))
            .await
            .unwrap();

        let err = service
            .update_route_status(route.id, RouteStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidStatusTransition {
                from: RouteStatus::Calculated,
                to: RouteStatus::Completed
            }
        ));

        service
            .update_route_status(route.id, RouteStatus::InProgress)
            .await
            .unwrap();
        service
            .update_route_status(route.id, RouteStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_optimize_route_with_return_leg() {
        let service = service();
        let request = OptimizeRouteRequest {
            start: loc(0.0, 0.0),
            destinations: vec![loc(0.0, 2.0), loc(0.0, 1.0)],
            end: Some(loc(0.0, 0.0)),
        };

        let optimized = service.optimize_route(request).await.unwrap();
        assert_eq!(optimized.ordered_stops, vec![loc(0.0, 1.0), loc(0.0, 2.0)]);
        assert!((optimized.total_distance_km - 444.77).abs() < 1e-9);
        // Legs of 111.19, 111.19 and 222.39 km: 133 + 133 + 266 minutes
        assert_eq!(optimized.total_duration_minutes, 532);
        assert!(optimized
            .description
            .starts_with("Optimized route for 2 destination(s). Total distance: 444.77 km"));
        assert!(service.list_routes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_report() {
        let service = service();
        let report = service.health_check().await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.repository, "memory");
        assert_eq!(report.cache.unwrap().backend, "memory");
    }
}

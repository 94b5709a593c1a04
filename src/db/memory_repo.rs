use crate::db::RouteRepository;
use crate::error::Result;
use crate::models::route::StatusCounts;
use crate::models::{timestamp_now, NewRoute, Route, RouteStatistics, RouteStatus};
use crate::services::distance::round2;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Process-local route store used when no database is configured, and by tests.
/// Routes are kept in id order; ids start at 1 and are never reused.
pub struct MemoryRouteRepository {
    routes: RwLock<BTreeMap<i64, Route>>,
    next_id: AtomicI64,
}

impl MemoryRouteRepository {
    pub fn new() -> Self {
        MemoryRouteRepository {
            routes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryRouteRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteRepository for MemoryRouteRepository {
    async fn save(&self, route: NewRoute) -> Result<Route> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let route = route.into_route(id);
        self.routes.write().await.insert(id, route.clone());
        Ok(route)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Route>> {
        Ok(self.routes.read().await.get(&id).cloned())
    }

    async fn find_by_delivery_id(&self, delivery_id: i64) -> Result<Option<Route>> {
        let routes = self.routes.read().await;
        Ok(routes
            .values()
            .filter(|r| r.delivery_id == Some(delivery_id))
            .max_by_key(|r| (r.calculated_at, r.id))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Route>> {
        Ok(self.routes.read().await.values().cloned().collect())
    }

    async fn find_by_status(&self, status: RouteStatus) -> Result<Vec<Route>> {
        Ok(self
            .routes
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: i64, status: RouteStatus) -> Result<Option<Route>> {
        let mut routes = self.routes.write().await;
        Ok(routes.get_mut(&id).map(|route| {
            route.status = status;
            route.updated_at = timestamp_now();
            route.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.routes.write().await.remove(&id).is_some())
    }

    async fn statistics(&self) -> Result<RouteStatistics> {
        let routes = self.routes.read().await;
        if routes.is_empty() {
            return Ok(RouteStatistics::default());
        }

        let mut count_by_status = StatusCounts::default();
        let mut distance_sum = 0.0;
        let mut duration_sum = 0.0;
        for route in routes.values() {
            count_by_status.increment(route.status);
            distance_sum += route.distance_km;
            duration_sum += f64::from(route.duration_minutes);
        }

        let total = routes.len() as f64;
        Ok(RouteStatistics {
            total_routes: routes.len() as i64,
            average_distance_km: round2(distance_sum / total),
            average_duration_minutes: round2(duration_sum / total),
            count_by_status,
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationPolicy, Coordinates, Location};
    use time::{Duration, OffsetDateTime};

    fn new_route(delivery_id: Option<i64>, distance_km: f64, duration_minutes: u32) -> NewRoute {
        NewRoute {
            delivery_id,
            policy: CalculationPolicy::ShortestDistance,
            status: RouteStatus::Calculated,
            origin: Location::new(Coordinates::new(0.0, 0.0).unwrap()),
            destination: Location::new(Coordinates::new(0.0, 1.0).unwrap()),
            distance_km,
            duration_minutes,
            estimated_cost: 0.0,
            fuel_cost: 0.0,
            co2_emissions_kg: 0.0,
            average_speed_kmh: 50.0,
            steps: vec![],
            calculated_at: OffsetDateTime::now_utc(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_save_assigns_increasing_ids() {
        let repo = MemoryRouteRepository::new();
        let first = repo.save(new_route(None, 10.0, 12)).await.unwrap();
        let second = repo.save(new_route(None, 20.0, 24)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.updated_at, first.calculated_at);
        assert_eq!(repo.find_by_id(2).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = MemoryRouteRepository::new();
        let first = repo.save(new_route(None, 10.0, 12)).await.unwrap();
        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());

        let next = repo.save(new_route(None, 10.0, 12)).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_find_by_delivery_returns_most_recent() {
        let repo = MemoryRouteRepository::new();
        let mut older = new_route(Some(7), 10.0, 12);
        older.calculated_at -= Duration::hours(1);
        repo.save(older).await.unwrap();
        let newer = repo.save(new_route(Some(7), 30.0, 36)).await.unwrap();
        repo.save(new_route(Some(8), 5.0, 6)).await.unwrap();

        let found = repo.find_by_delivery_id(7).await.unwrap().unwrap();
        assert_eq!(found.id, newer.id);
        assert!(repo.find_by_delivery_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_and_filter() {
        let repo = MemoryRouteRepository::new();
        let route = repo.save(new_route(None, 10.0, 12)).await.unwrap();
        repo.save(new_route(None, 20.0, 24)).await.unwrap();

        let updated = repo
            .update_status(route.id, RouteStatus::InProgress)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, RouteStatus::InProgress);
        assert!(updated.updated_at >= route.updated_at);

        let in_progress = repo.find_by_status(RouteStatus::InProgress).await.unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, route.id);

        assert!(repo
            .update_status(99, RouteStatus::Completed)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_statistics() {
        let repo = MemoryRouteRepository::new();
        assert_eq!(repo.statistics().await.unwrap(), RouteStatistics::default());

        let route = repo.save(new_route(None, 10.0, 12)).await.unwrap();
        repo.save(new_route(None, 20.0, 25)).await.unwrap();
        repo.update_status(route.id, RouteStatus::Cancelled)
            .await
            .unwrap();

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.total_routes, 2);
        assert_eq!(stats.average_distance_km, 15.0);
        assert_eq!(stats.average_duration_minutes, 18.5);
        assert_eq!(stats.count_by_status.calculated, 1);
        assert_eq!(stats.count_by_status.cancelled, 1);
        assert_eq!(stats.count_by_status.in_progress, 0);
    }
}

use crate::error::Result;
use crate::models::{NewRoute, Route, RouteStatistics, RouteStatus};
use async_trait::async_trait;

/// Storage for calculated routes and their steps.
///
/// `save` assigns the id. Lookups return `None` instead of an error when
/// nothing matches; the service layer decides what "not found" means.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn save(&self, route: NewRoute) -> Result<Route>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Route>>;

    /// Most recent route for the delivery when several exist
    async fn find_by_delivery_id(&self, delivery_id: i64) -> Result<Option<Route>>;

    async fn find_all(&self) -> Result<Vec<Route>>;

    async fn find_by_status(&self, status: RouteStatus) -> Result<Vec<Route>>;

    /// Set the status and bump `updated_at`, returning the updated route
    async fn update_status(&self, id: i64, status: RouteStatus) -> Result<Option<Route>>;

    /// Returns false when no route had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn statistics(&self) -> Result<RouteStatistics>;

    async fn health_check(&self) -> bool;

    fn backend_name(&self) -> &'static str;
}

pub struct PgRouteRepository {
    pool: sqlx::PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn save(&self, route: NewRoute) -> Result<Route> {
        Ok(super::route_queries::insert_route(&self.pool, route).await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Route>> {
        Ok(super::route_queries::find_route_by_id(&self.pool, id).await?)
    }

    async fn find_by_delivery_id(&self, delivery_id: i64) -> Result<Option<Route>> {
        Ok(super::route_queries::find_route_by_delivery_id(&self.pool, delivery_id).await?)
    }

    async fn find_all(&self) -> Result<Vec<Route>> {
        Ok(super::route_queries::list_routes(&self.pool, None).await?)
    }

    async fn find_by_status(&self, status: RouteStatus) -> Result<Vec<Route>> {
        Ok(super::route_queries::list_routes(&self.pool, Some(status)).await?)
    }

    async fn update_status(&self, id: i64, status: RouteStatus) -> Result<Option<Route>> {
        if !super::route_queries::update_route_status(&self.pool, id, status).await? {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(super::route_queries::delete_route(&self.pool, id).await?)
    }

    async fn statistics(&self) -> Result<RouteStatistics> {
        Ok(super::route_queries::get_route_statistics(&self.pool).await?)
    }

    async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

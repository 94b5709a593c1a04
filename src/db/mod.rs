use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod memory_repo;
pub mod route_queries;
pub mod route_repository;

pub use memory_repo::MemoryRouteRepository;
pub use route_repository::{PgRouteRepository, RouteRepository};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

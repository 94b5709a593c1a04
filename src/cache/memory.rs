use crate::cache::{CacheStats, RouteCache};
use crate::models::Route;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory route cache backed by moka, with TTL and bounded capacity
pub struct MemoryCacheService {
    routes: Cache<i64, Arc<Route>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheService {
    pub fn new(route_ttl_seconds: u64, max_capacity: u64) -> Self {
        let routes = Cache::builder()
            .time_to_live(Duration::from_secs(route_ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        MemoryCacheService {
            routes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl RouteCache for MemoryCacheService {
    async fn get_route(&self, id: i64) -> Option<Route> {
        match self.routes.get(&id).await {
            Some(route) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Memory cache hit for route {}", id);
                Some((*route).clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Memory cache miss for route {}", id);
                None
            }
        }
    }

    async fn cache_route(&self, route: &Route) {
        self.routes.insert(route.id, Arc::new(route.clone())).await;
        tracing::debug!("Memory cached route {}", route.id);
    }

    async fn invalidate(&self, id: i64) {
        self.routes.invalidate(&id).await;
        tracing::debug!("Memory cache invalidated route {}", id);
    }

    async fn get_stats(&self) -> CacheStats {
        CacheStats::from_counts(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            true,
        )
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

mod memory;
mod redis;

pub use self::memory::MemoryCacheService;
pub use self::redis::RedisCacheService;

use crate::models::Route;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Read-through cache for stored routes, keyed by route id.
///
/// Implementations swallow backend failures: a cache that cannot be reached
/// behaves like an empty one and logs a warning.
#[async_trait]
pub trait RouteCache: Send + Sync {
    async fn get_route(&self, id: i64) -> Option<Route>;

    async fn cache_route(&self, route: &Route);

    async fn invalidate(&self, id: i64);

    async fn get_stats(&self) -> CacheStats;

    async fn health_check(&self) -> bool;

    fn backend_name(&self) -> &'static str;
}

/// Orders cache fills against invalidations.
///
/// A reader takes a [`generation`](CacheFence::generation) before reading the
/// repository and hands it back to [`fill`](CacheFence::fill). Writers go
/// through [`invalidate`](CacheFence::invalidate) after their repository write,
/// which bumps the generation, so a fill started before that write is dropped
/// instead of putting the old route back.
#[derive(Debug, Default)]
pub struct CacheFence {
    generation: Mutex<u64>,
}

impl CacheFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generation(&self) -> u64 {
        *self.generation.lock().await
    }

    /// Cache `route` unless an invalidation happened since `seen`.
    /// Returns whether the route was cached.
    pub async fn fill(&self, cache: &dyn RouteCache, route: &Route, seen: u64) -> bool {
        let generation = self.generation.lock().await;
        if *generation != seen {
            tracing::debug!("Skipping cache fill for route {}: invalidated meanwhile", route.id);
            return false;
        }
        cache.cache_route(route).await;
        true
    }

    pub async fn invalidate(&self, cache: &dyn RouteCache, id: i64) {
        let mut generation = self.generation.lock().await;
        *generation = generation.wrapping_add(1);
        cache.invalidate(id).await;
    }
}

/// Generate the cache key of a stored route
pub fn route_cache_key(id: i64) -> String {
    format!("route:{}", id)
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub connected: bool,
}

impl CacheStats {
    pub fn from_counts(hits: u64, misses: u64, connected: bool) -> Self {
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            connected,
        }
    }
}

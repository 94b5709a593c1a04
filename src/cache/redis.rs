use crate::cache::{route_cache_key, CacheStats, RouteCache};
use crate::error::{AppError, Result};
use crate::models::Route;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed route cache. Routes are stored as JSON under `route:{id}`.
/// `ConnectionManager` clones share one multiplexed connection.
pub struct RedisCacheService {
    connection: ConnectionManager,
    route_cache_ttl: u64,
}

impl RedisCacheService {
    pub async fn new(redis_url: &str, route_cache_ttl: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Redis cache connection established");

        Ok(RedisCacheService {
            connection,
            route_cache_ttl,
        })
    }
}

#[async_trait]
impl RouteCache for RedisCacheService {
    async fn get_route(&self, id: i64) -> Option<Route> {
        let key = route_cache_key(id);
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<Option<String>> = conn.get(&key).await;

        match result {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(route) => {
                    tracing::debug!("Cache hit for route: {}", key);
                    Some(route)
                }
                Err(e) => {
                    tracing::warn!("Failed to deserialize cached route {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Cache miss for route: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Redis error getting route {}: {}", key, e);
                None
            }
        }
    }

    async fn cache_route(&self, route: &Route) {
        let json = match serde_json::to_string(route) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Failed to serialize route {} for cache: {}", route.id, e);
                return;
            }
        };

        let key = route_cache_key(route.id);
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = conn.set_ex(&key, json, self.route_cache_ttl).await;

        match result {
            Ok(()) => {
                tracing::debug!("Cached route with TTL {}s: {}", self.route_cache_ttl, key);
            }
            Err(e) => {
                tracing::warn!("Failed to cache route {}: {}", key, e);
            }
        }
    }

    async fn invalidate(&self, id: i64) {
        let key = route_cache_key(id);
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<i64> = conn.del(&key).await;

        if let Err(e) = result {
            tracing::warn!("Failed to invalidate cached route {}: {}", key, e);
        }
    }

    async fn get_stats(&self) -> CacheStats {
        let mut conn = self.connection.clone();
        let info: redis::RedisResult<String> =
            redis::cmd("INFO").arg("stats").query_async(&mut conn).await;

        match info {
            Ok(info_str) => CacheStats::from_counts(
                parse_info_value(&info_str, "keyspace_hits"),
                parse_info_value(&info_str, "keyspace_misses"),
                true,
            ),
            Err(_) => CacheStats::default(),
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

fn parse_info_value(info: &str, key: &str) -> u64 {
    info.lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(0)
}

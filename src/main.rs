use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypath::cache::{MemoryCacheService, RedisCacheService, RouteCache};
use waypath::config::Config;
use waypath::constants::DEFAULT_MEMORY_CACHE_MAX_ENTRIES;
use waypath::db::{MemoryRouteRepository, PgRouteRepository, RouteRepository};
use waypath::services::RouteService;
use waypath::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypath=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting Waypath route service");
    tracing::info!(
        average_speed_kmh = config.routing.average_speed_kmh,
        max_distance_km = config.routing.max_distance_km,
        strict_status_transitions = config.routing.strict_status_transitions,
        "Configuration loaded successfully"
    );

    // Route storage: PostgreSQL when configured, process memory otherwise
    let repository: Arc<dyn RouteRepository> = if let Some(ref database_url) = config.database_url
    {
        tracing::info!("Connecting to database...");
        let db_pool = waypath::db::create_pool(database_url).await?;
        tracing::info!("Database connection established");

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Database migrations completed");

        Arc::new(PgRouteRepository::new(db_pool))
    } else {
        tracing::warn!("DATABASE_URL not configured. Routes are kept in memory only.");
        Arc::new(MemoryRouteRepository::new())
    };

    // Initialize cache: try Redis, fall back to in-memory
    let cache: Arc<dyn RouteCache> = if let Some(ref redis_url) = config.redis_url {
        tracing::info!("Connecting to Redis cache...");
        match RedisCacheService::new(redis_url, config.route_cache_ttl).await {
            Ok(redis_cache) => Arc::new(redis_cache),
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to Redis: {}. Falling back to in-memory cache.",
                    e
                );
                Arc::new(MemoryCacheService::new(
                    config.route_cache_ttl,
                    DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
                ))
            }
        }
    } else {
        tracing::info!("Redis URL not configured. Using in-memory cache.");
        Arc::new(MemoryCacheService::new(
            config.route_cache_ttl,
            DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
        ))
    };

    let route_service = RouteService::new(
        repository,
        config.routing.clone(),
        config.pricing.clone(),
        Some(cache),
    );

    // Create application state
    let state = Arc::new(AppState { route_service });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", waypath::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

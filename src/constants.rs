//! Stable application-wide constants.
//!
//! Values here are default fallbacks for env-var-based configuration. Rate
//! constants are never read from here directly by the pricing or routing
//! code: they flow through [`PricingConfig`](crate::config::PricingConfig)
//! and [`RoutingConfig`](crate::config::RoutingConfig).

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Cache defaults ---

/// Default route cache TTL: 1 hour. Overridden by `ROUTE_CACHE_TTL`.
pub const DEFAULT_ROUTE_CACHE_TTL_SECONDS: u64 = 3_600;
/// Maximum entries for the in-memory route cache.
pub const DEFAULT_MEMORY_CACHE_MAX_ENTRIES: u64 = 1_000;

// --- Pricing defaults (currency units are whatever the rates are expressed in) ---

/// Base price charged per kilometer before the policy multiplier.
pub const DEFAULT_BASE_RATE_PER_KM: f64 = 2.5;
/// Fuel price per liter.
pub const DEFAULT_FUEL_PRICE_PER_LITER: f64 = 15.0;
/// Vehicle consumption in liters per 100 km.
pub const DEFAULT_CONSUMPTION_PER_100KM: f64 = 8.0;
/// CO2 emitted per kilometer, in kg.
pub const DEFAULT_EMISSION_FACTOR_PER_KM: f64 = 0.12;
/// Multiplier for the `eco` policy. Must stay below 1.
pub const DEFAULT_ECO_MULTIPLIER: f64 = 0.8;
/// Multiplier for the `fastest_time` policy. Must stay above 1.
pub const DEFAULT_EXPRESS_MULTIPLIER: f64 = 1.3;
/// Multiplier for the `lowest_cost` policy.
pub const DEFAULT_LOWEST_COST_MULTIPLIER: f64 = 0.9;

// --- Routing defaults ---

/// Average speed used to derive durations from straight-line distances.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 50.0;
/// Routes whose direct origin-destination distance exceeds this are rejected.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 500.0;
/// 2-opt refinement only runs below this many stops; it is O(n^3) per call.
pub const DEFAULT_TWO_OPT_MAX_STOPS: usize = 10;

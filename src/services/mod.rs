pub mod distance;
pub mod pricing;
pub mod route_optimizer;
pub mod route_service;

pub use distance::DistanceCalculator;
pub use pricing::PricingCalculator;
pub use route_optimizer::RouteOptimizer;
pub use route_service::RouteService;

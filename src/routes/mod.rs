pub mod debug;
pub mod itineraries;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/routes", get(itineraries::list_routes))
        .route("/routes/calculate", post(itineraries::calculate_route))
        .route("/routes/optimize", post(itineraries::optimize_route))
        .route("/routes/stats", get(itineraries::route_statistics))
        .route(
            "/routes/{id}",
            get(itineraries::get_route).delete(itineraries::delete_route),
        )
        .route("/routes/{id}/status", patch(itineraries::update_route_status))
        .route(
            "/routes/delivery/{delivery_id}",
            get(itineraries::get_route_by_delivery),
        )
        .route("/debug/health", get(debug::health_check))
        .with_state(state)
}

use crate::services::route_service::HealthReport;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

/// GET /debug/health - Check repository and cache backends
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.route_service.health_check().await;

    let status = if report.repository_healthy {
        StatusCode::OK
    } else {
        tracing::error!("Health check failed for {} repository", report.repository);
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(report))
}

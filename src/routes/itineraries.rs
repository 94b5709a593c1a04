use crate::error::{AppError, Result};
use crate::models::route::{
    OptimizeRouteRequest, RouteCalculationRequest, RouteListResponse, UpdateStatusRequest,
};
use crate::models::{OptimizedRoute, Route, RouteStatistics, RouteStatus};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for route listing
#[derive(Debug, Deserialize)]
pub struct RouteListParams {
    /// Only return routes in this status (e.g. `in_progress`)
    #[serde(default)]
    pub status: Option<String>,
}

impl RouteListParams {
    pub fn parse_status(&self) -> Result<Option<RouteStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<RouteStatus>()
                .map(Some)
                .map_err(AppError::InvalidRequest),
        }
    }
}

/// POST /routes/calculate
pub async fn calculate_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteCalculationRequest>,
) -> Result<Json<Route>> {
    let route = state.route_service.calculate_route(request).await?;
    Ok(Json(route))
}

/// POST /routes/optimize
/// Order destinations without storing anything
pub async fn optimize_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OptimizeRouteRequest>,
) -> Result<Json<OptimizedRoute>> {
    let optimized = state.route_service.optimize_route(request).await?;
    Ok(Json(optimized))
}

/// GET /routes?status=
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RouteListParams>,
) -> Result<Json<RouteListResponse>> {
    let routes = match params.parse_status()? {
        Some(status) => state.route_service.list_routes_by_status(status).await?,
        None => state.route_service.list_routes().await?,
    };

    Ok(Json(RouteListResponse {
        count: routes.len(),
        routes,
    }))
}

/// GET /routes/stats
pub async fn route_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RouteStatistics>> {
    let stats = state.route_service.statistics().await?;
    Ok(Json(stats))
}

/// GET /routes/{id}
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Route>> {
    let route = state.route_service.get_route_by_id(id).await?;
    Ok(Json(route))
}

/// GET /routes/delivery/{delivery_id}
pub async fn get_route_by_delivery(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<i64>,
) -> Result<Json<Route>> {
    let route = state
        .route_service
        .get_route_by_delivery_id(delivery_id)
        .await?;
    Ok(Json(route))
}

/// PATCH /routes/{id}/status
pub async fn update_route_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Route>> {
    let route = state
        .route_service
        .update_route_status(id, request.status)
        .await?;
    Ok(Json(route))
}

/// DELETE /routes/{id}
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.route_service.delete_route(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

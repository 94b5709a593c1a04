use crate::models::RouteStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error(
        "Distance exceeds maximum allowed: {distance_km:.2} km > {max_distance_km:.2} km"
    )]
    RouteTooLong {
        distance_km: f64,
        max_distance_km: f64,
    },

    #[error("{0}")]
    RouteNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: RouteStatus, to: RouteStatus },

    #[error("Internal server error: {0}")]
    Internal(String),
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, message.as_str())
            }
            AppError::Cache(ref e) => {
                tracing::warn!("Cache error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache error")
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::InvalidCoordinate(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::RouteTooLong { .. } => {
                tracing::info!("{}", message);
                (StatusCode::UNPROCESSABLE_ENTITY, message.as_str())
            }
            AppError::RouteNotFound(ref e) => (StatusCode::NOT_FOUND, e.as_str()),
            AppError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, message.as_str()),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

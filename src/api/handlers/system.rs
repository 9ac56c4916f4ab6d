//! System endpoints: health check and API index.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ErrorResponse;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Current server time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Live WebSocket connections.
    pub connections: usize,
}

/// API index response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiInfoResponse {
    /// Greeting shown by the dashboard's connectivity check.
    pub message: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp, and the number of live WebSocket connections.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connections: state.connections.len().await,
        }),
    )
}

/// `GET /api`: Authenticated API index.
#[utoipa::path(
    get,
    path = "/api",
    tag = "System",
    summary = "API index",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token accepted", body = ApiInfoResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn api_info(_user: AuthUser) -> impl IntoResponse {
    Json(ApiInfoResponse {
        message: "Companion gateway API".to_string(),
    })
}

/// System routes mounted at the root level (not under `/api`).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

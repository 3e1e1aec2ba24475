//! System endpoints: health check with feed status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::TransferPosition;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    /// Open WebSocket connections listening to the transfer feed.
    ws_connections: usize,
    /// Position of the last transfer published, if any.
    last_transfer: Option<TransferPosition>,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp, and the number of WebSocket connections, and the position of the last published transfer.",
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
            ws_connections: state.feed.receiver_count(),
            last_transfer: state.feed.position(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

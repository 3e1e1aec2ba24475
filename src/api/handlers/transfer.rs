//! Transfer inspection handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::ManualCheckResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /transfers/manual-check`: Read the most recent transfers.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the transfer store
/// cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/transfers/manual-check",
    tag = "Transfers",
    summary = "Manual transfer check",
    description = "Reads the newest transfers straight from the store, bypassing the poller. Useful to confirm a payment when no subscription fired.",
    responses(
        (status = 200, description = "Recent transfers, newest first", body = ManualCheckResponse),
        (status = 500, description = "Transfer store unavailable", body = ErrorResponse),
    )
)]
pub async fn manual_check(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let transfers = state.source.recent(state.manual_check_limit.max(1)).await?;
    tracing::debug!(count = transfers.len(), "manual transfer check");
    Ok((
        StatusCode::OK,
        Json(ManualCheckResponse {
            count: transfers.len(),
            transfers,
        }),
    ))
}

/// Transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfers/manual-check", post(manual_check))
}

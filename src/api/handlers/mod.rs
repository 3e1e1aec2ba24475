//! REST endpoint handlers organized by resource.

pub mod payment;
pub mod system;
pub mod transfer;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(payment::routes())
        .merge(transfer::routes())
}

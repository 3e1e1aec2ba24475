//! Transfer listing DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::TransferEvent;

/// Response body for `POST /transfers/manual-check`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ManualCheckResponse {
    /// Number of transfers returned.
    pub count: usize,
    /// Most recent transfers, newest first.
    pub transfers: Vec<TransferEvent>,
}

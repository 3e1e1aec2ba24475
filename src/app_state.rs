//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::PaymentLinks;
use crate::source::{TransferFeed, TransferSource};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Transfer feed every WebSocket connection subscribes to.
    pub feed: TransferFeed,
    /// Transfer store for on-demand reads.
    pub source: Arc<dyn TransferSource>,
    /// Wallet link settings for payment requests.
    pub payment_links: Arc<PaymentLinks>,
    /// Rows returned by the manual check endpoint.
    pub manual_check_limit: i64,
}

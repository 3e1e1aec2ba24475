//! Event source: where observed transfers come from.
//!
//! [`TransferSource`] abstracts the table the on-chain indexer writes to.
//! [`TransferPoller`] pages through it by [`TransferPosition`] and
//! publishes each new row once on the [`TransferFeed`].
//!
//! - [`PostgresTransferSource`] reads the indexer's PostgreSQL table.
//! - [`MemorySource`] keeps rows in memory for tests and local runs.

mod feed;
mod memory;
pub mod poller;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{TransferEvent, TransferPosition};
use crate::error::GatewayError;

pub use feed::TransferFeed;
pub use memory::MemorySource;
pub use poller::TransferPoller;
pub use postgres::PostgresTransferSource;

/// Read access to stored transfers.
#[async_trait]
pub trait TransferSource: Send + Sync + std::fmt::Debug {
    /// Up to `limit` transfers strictly after `after` (from the very first
    /// transfer when `None`), in ascending [`TransferPosition`] order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store is
    /// unreachable.
    async fn fetch_after(
        &self,
        after: Option<TransferPosition>,
        limit: i64,
    ) -> Result<Vec<TransferEvent>, GatewayError>;

    /// The `limit` newest transfers, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store is
    /// unreachable.
    async fn recent(&self, limit: i64) -> Result<Vec<TransferEvent>, GatewayError>;

    /// Position of the newest stored transfer, or `None` when the store
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store is
    /// unreachable.
    async fn latest_position(&self) -> Result<Option<TransferPosition>, GatewayError> {
        Ok(self.recent(1).await?.first().map(TransferEvent::position))
    }
}

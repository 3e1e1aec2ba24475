//! In-memory transfer store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TransferSource;
use crate::domain::{TransferEvent, TransferPosition};
use crate::error::GatewayError;

/// Transfer store backed by a `Vec`, kept sorted by [`TransferPosition`].
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: RwLock<Vec<TransferEvent>>,
}

impl MemorySource {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a transfer.
    pub async fn insert(&self, event: TransferEvent) {
        let mut rows = self.rows.write().await;
        let at = rows.partition_point(|row| row.position() <= event.position());
        rows.insert(at, event);
    }

    /// Number of stored transfers.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn take(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl TransferSource for MemorySource {
    async fn fetch_after(
        &self,
        after: Option<TransferPosition>,
        limit: i64,
    ) -> Result<Vec<TransferEvent>, GatewayError> {
        let rows = self.rows.read().await;
        let start = after.map_or(0, |after| rows.partition_point(|row| row.position() <= after));
        Ok(rows
            .iter()
            .skip(start)
            .take(take(limit))
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<TransferEvent>, GatewayError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().rev().take(take(limit)).cloned().collect())
    }
}

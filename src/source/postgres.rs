//! PostgreSQL transfer source over the indexer's middleware transfer table.

use alloy::hex;
use async_trait::async_trait;
use sqlx::PgPool;

use super::TransferSource;
use crate::domain::{TransferEvent, TransferPosition};
use crate::error::GatewayError;

type TransferRow = (
    i64,
    i64,
    i64,
    i64,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<Vec<u8>>,
);

const POSITION: &str =
    "\"timestamp\"::bigint, \"blockNumber\"::bigint, \"transactionIndex\"::bigint, \"logIndex\"::bigint";

/// Reads transfers with `sqlx::PgPool`.
///
/// Rows are paged by keyset over `(timestamp, blockNumber,
/// transactionIndex, logIndex)`, so every page starts exactly after the
/// last row of the previous one no matter how many rows share a block.
/// `amount` is selected as text so fixed-point values never pass through
/// a float. `data` is stored as `bytea` and decoded as UTF-8, falling back
/// to hex.
#[derive(Debug, Clone)]
pub struct PostgresTransferSource {
    pool: PgPool,
    select: String,
}

impl PostgresTransferSource {
    /// Creates a source reading from `table`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `table` is not a plain
    /// identifier (ASCII letters, digits and `_`).
    pub fn new(pool: PgPool, table: &str) -> Result<Self, GatewayError> {
        if table.is_empty() || !table.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid transfer table name: {table}"
            )));
        }
        let select = format!(
            "SELECT {POSITION}, \"transactionHash\", \"onBehalf\", sender, recipient, \
             COALESCE(amount::text, '0'), data FROM \"{table}\""
        );
        Ok(Self { pool, select })
    }

    fn ascending_after(&self) -> String {
        format!(
            "{} WHERE ({POSITION}) > ($1, $2, $3, $4) ORDER BY {POSITION} LIMIT $5",
            self.select
        )
    }

    fn ascending_from_start(&self) -> String {
        format!("{} ORDER BY {POSITION} LIMIT $1", self.select)
    }

    fn descending(&self) -> String {
        let order = POSITION.replace("::bigint", "::bigint DESC");
        format!("{} ORDER BY {order} LIMIT $1", self.select)
    }
}

fn into_event(row: TransferRow) -> TransferEvent {
    let (
        timestamp,
        block_number,
        transaction_index,
        log_index,
        transaction_hash,
        on_behalf,
        sender,
        recipient,
        amount,
        data,
    ) = row;
    TransferEvent {
        block_number,
        timestamp,
        transaction_index,
        log_index,
        transaction_hash,
        on_behalf,
        sender,
        recipient,
        amount,
        data: data.map(decode_data),
    }
}

/// Decodes a `bytea` payload as UTF-8, or hex when it is not valid UTF-8.
#[must_use]
pub fn decode_data(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| hex::encode(err.into_bytes()))
}

#[async_trait]
impl TransferSource for PostgresTransferSource {
    async fn fetch_after(
        &self,
        after: Option<TransferPosition>,
        limit: i64,
    ) -> Result<Vec<TransferEvent>, GatewayError> {
        let rows = match after {
            Some(after) => {
                sqlx::query_as::<_, TransferRow>(&self.ascending_after())
                    .bind(after.timestamp)
                    .bind(after.block_number)
                    .bind(after.transaction_index)
                    .bind(after.log_index)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, TransferRow>(&self.ascending_from_start())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(into_event).collect())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<TransferEvent>, GatewayError> {
        let rows = sqlx::query_as::<_, TransferRow>(&self.descending())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(into_event).collect())
    }
}

//! Normalized token transfer observed on chain.
//!
//! A [`TransferEvent`] is built once by the event source from a raw table
//! row, then shared read-only with the transfer feed and every
//! [`super::SubscriptionRegistry`] it reaches. Its [`TransferPosition`]
//! orders it among all other transfers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a transfer sits in chain order.
///
/// Ordering is lexicographic over the fields in declaration order, which
/// is the order the indexer writes rows in. No two stored transfers share
/// a position, since `log_index` is unique within a block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct TransferPosition {
    /// Block timestamp (unix seconds).
    pub timestamp: i64,
    /// Block number.
    pub block_number: i64,
    /// Index of the transaction within its block.
    pub transaction_index: i64,
    /// Index of the transfer log within its block.
    pub log_index: i64,
}

impl TransferPosition {
    /// Position just before the first transfer at `timestamp`.
    #[must_use]
    pub const fn start_of(timestamp: i64) -> Self {
        Self {
            timestamp,
            block_number: i64::MIN,
            transaction_index: i64::MIN,
            log_index: i64::MIN,
        }
    }
}

/// One observed token transfer.
///
/// `amount` stays a decimal string (18 implied decimals) so values beyond
/// the safe-integer range of JSON consumers survive serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    /// Block the transfer was included in.
    pub block_number: i64,
    /// Block timestamp (unix seconds).
    pub timestamp: i64,
    /// Index of the transaction within its block.
    #[serde(default)]
    pub transaction_index: i64,
    /// Index of the transfer log, unique within a block.
    #[serde(default)]
    pub log_index: i64,
    /// Transaction hash.
    pub transaction_hash: String,
    /// Account the transfer was made on behalf of, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_behalf: Option<String>,
    /// Sending address.
    pub sender: String,
    /// Receiving address.
    pub recipient: String,
    /// Fixed-point amount string.
    pub amount: String,
    /// Application payload (`appId` or `appId:customPayload`).
    #[serde(default)]
    pub data: Option<String>,
}

impl TransferEvent {
    /// Position of this transfer in chain order.
    #[must_use]
    pub const fn position(&self) -> TransferPosition {
        TransferPosition {
            timestamp: self.timestamp,
            block_number: self.block_number,
            transaction_index: self.transaction_index,
            log_index: self.log_index,
        }
    }

    /// Returns the application identifier part of `data`, without any
    /// custom payload suffix.
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        let data = self.data.as_deref()?;
        Some(data.split_once(':').map_or(data, |(app, _)| app))
    }

    /// Returns the custom payload following the first `:` in `data`.
    #[must_use]
    pub fn custom_payload(&self) -> Option<&str> {
        self.data
            .as_deref()
            .and_then(|data| data.split_once(':'))
            .map(|(_, payload)| payload)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_event(recipient: &str, amount: &str, data: Option<&str>) -> TransferEvent {
        TransferEvent {
            block_number: 100,
            timestamp: 1_700_000_000,
            transaction_index: 0,
            log_index: 0,
            transaction_hash: "0xfeed".to_string(),
            on_behalf: None,
            sender: "0xdef".to_string(),
            recipient: recipient.to_string(),
            amount: amount.to_string(),
            data: data.map(str::to_string),
        }
    }

    #[test]
    fn serializes_camel_case() {
        let event = make_event("0xabc", "1000000000000000000", Some("random-number"));
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["blockNumber"], 100);
        assert_eq!(json["transactionHash"], "0xfeed");
        assert_eq!(json["amount"], "1000000000000000000");
        assert!(json.get("onBehalf").is_none());
    }

    #[test]
    fn app_id_and_payload() {
        let event = make_event("0xabc", "1", Some("random-number:seat-4"));
        assert_eq!(event.app_id(), Some("random-number"));
        assert_eq!(event.custom_payload(), Some("seat-4"));

        let plain = make_event("0xabc", "1", Some("random-number"));
        assert_eq!(plain.app_id(), Some("random-number"));
        assert_eq!(plain.custom_payload(), None);

        let empty = make_event("0xabc", "1", None);
        assert_eq!(empty.app_id(), None);
    }

    #[test]
    fn positions_order_by_chain_coordinates() {
        let mut first = make_event("0xabc", "1", None);
        first.log_index = 3;
        let mut same_tx = first.clone();
        same_tx.log_index = 4;
        let mut next_block = make_event("0xabc", "1", None);
        next_block.block_number = 101;

        assert!(first.position() < same_tx.position());
        assert!(same_tx.position() < next_block.position());
        assert!(TransferPosition::start_of(first.timestamp) < first.position());
        assert_ne!(first.position(), same_tx.position());
    }
}

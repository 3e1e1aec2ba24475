//! Payment request DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /payments/request`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentRequestBody {
    /// Whole tokens to request.
    pub amount: u64,
    /// Application identifier written to the transfer's data field.
    pub app_id: String,
    /// Optional payload appended to the data field as `app_id:payload`.
    #[serde(default)]
    pub custom_data: Option<String>,
    /// Recipient address. Defaults to the gateway's configured recipient.
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Response body for `POST /payments/request`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentRequestResponse {
    /// Whole tokens requested.
    pub amount: u64,
    /// Amount in 18-decimal fixed point, as it will appear on the transfer.
    pub value: String,
    /// Application identifier.
    pub app_id: String,
    /// Custom payload, if any.
    pub custom_data: Option<String>,
    /// Data field the transfer will carry.
    pub data: String,
    /// Lowercased recipient address.
    pub recipient: String,
    /// `0x`-prefixed packed `(address, address, bytes)` transfer data.
    pub packed_data: String,
    /// Wallet link that opens a prefilled transfer.
    pub url: String,
}

//! Payment instructions that a wallet turns into an on-chain transfer.
//!
//! The transfer's `data` field carries the app identifier, optionally
//! followed by `:customPayload`. Subscribers filtering on the bare app
//! identifier still match thanks to the substring rule of
//! [`super::DataMatch::Contains`].

use alloy::hex::{self, FromHex};
use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolValue;

use super::amount;
use crate::error::GatewayError;

/// A validated request to pay `amount` tokens to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    amount: u64,
    app_id: String,
    custom_payload: Option<String>,
    recipient: Address,
}

impl PaymentRequest {
    /// Validates and builds a payment request.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidAmount`] if `amount` is zero.
    /// - [`GatewayError::InvalidRequest`] if `app_id` is blank.
    /// - [`GatewayError::MissingRecipient`] if `recipient` is blank.
    /// - [`GatewayError::InvalidAddress`] if `recipient` is not a 20-byte
    ///   hex address.
    pub fn new(
        amount: u64,
        app_id: &str,
        custom_payload: Option<&str>,
        recipient: &str,
    ) -> Result<Self, GatewayError> {
        if amount == 0 {
            return Err(GatewayError::InvalidAmount("0".to_string()));
        }
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(GatewayError::InvalidRequest("app_id is required".to_string()));
        }
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(GatewayError::MissingRecipient);
        }
        let recipient = Address::from_hex(recipient)
            .map_err(|_| GatewayError::InvalidAddress(recipient.to_string()))?;

        Ok(Self {
            amount,
            app_id: app_id.to_string(),
            custom_payload: custom_payload
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            recipient,
        })
    }

    /// Whole tokens to transfer.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Amount as the fixed-point string the transfer will carry.
    #[must_use]
    pub fn fixed_point_amount(&self) -> String {
        amount::to_fixed_point_u64(self.amount)
    }

    /// Application identifier.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Custom payload, if any.
    #[must_use]
    pub fn custom_payload(&self) -> Option<&str> {
        self.custom_payload.as_deref()
    }

    /// Recipient address.
    #[must_use]
    pub const fn recipient(&self) -> Address {
        self.recipient
    }

    /// Recipient as lowercase `0x` hex, the form the indexer stores.
    #[must_use]
    pub fn recipient_hex(&self) -> String {
        hex::encode_prefixed(self.recipient)
    }

    /// `appId:customPayload`, or just `appId` without a payload.
    #[must_use]
    pub fn data_field(&self) -> String {
        match &self.custom_payload {
            Some(payload) => format!("{}:{payload}", self.app_id),
            None => self.app_id.clone(),
        }
    }

    /// `0x`-prefixed `abi.encodePacked(address onBehalf, address recipient,
    /// bytes data)` with a zero `onBehalf`.
    #[must_use]
    pub fn packed_data(&self) -> String {
        let data = Bytes::from(self.data_field().into_bytes());
        hex::encode_prefixed((Address::ZERO, self.recipient, data).abi_encode_packed())
    }

    /// Wallet deep link that pre-fills the transfer.
    #[must_use]
    pub fn transfer_url(&self, wallet_base_url: &str, group: &str) -> String {
        format!(
            "{}/transfer/{group}/crc/{}?data={}",
            wallet_base_url.trim_end_matches('/'),
            self.amount,
            self.packed_data()
        )
    }
}

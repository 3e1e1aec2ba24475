//! WebSocket message types: envelope, commands, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CriteriaSpec, TransferEvent};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message answering request `id`.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({
                "code": code,
                "message": message.into(),
            }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client matched transfer.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket, carried in the
/// envelope payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Register (or replace) a named subscription.
    Register {
        /// Subscription name, unique per connection.
        name: String,
        /// Transfer filter.
        #[serde(default)]
        criteria: CriteriaSpec,
    },
    /// Remove a named subscription.
    Unregister {
        /// Subscription name.
        name: String,
    },
    /// List registered subscription names.
    List,
}

/// Payload of an [`WsMessageType::Event`] message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMatch {
    /// Name of the subscription that matched.
    pub subscription: String,
    /// The matched transfer.
    pub transfer: TransferEvent,
}

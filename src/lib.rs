//! # oic-gateway
//!
//! Watches an indexed table of on-chain token transfers and delivers each
//! new transfer to every subscription whose criteria it satisfies.
//!
//! Subscriptions are named filters over recipient, sender, exact
//! fixed-point amount and the transfer's `data` field (an application id,
//! optionally followed by `:payload`). WebSocket clients register them at
//! runtime; in-process code can register closures directly on a
//! [`domain::SubscriptionRegistry`].
//!
//! ## Architecture
//!
//! ```text
//! PostgreSQL transfer table
//!     │
//!     ├── TransferPoller (source/)      keyset cursor, no replays
//!     │
//!     ├── TransferFeed (source/)        ordered broadcast fan-out
//!     │
//!     ├── WS connection (ws/)           one SubscriptionRegistry each
//!     │       └── matches(event, criteria) → handler → client frame
//!     │
//!     └── REST (api/)                   payment links, manual check
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod source;
pub mod ws;

//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` lets a client register named transfer
//! criteria and receive every matching transfer as it is observed.

pub mod connection;
pub mod handler;
pub mod messages;

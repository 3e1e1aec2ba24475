//! WebSocket connection state machine.
//!
//! Each connection owns one [`SubscriptionRegistry`]. Transfers from the
//! [`crate::source::TransferFeed`] are dispatched into it, and matches come
//! back as [`Delivery`] messages that are forwarded to the client.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use super::messages::{TransferMatch, WsCommand, WsMessage, WsMessageType};
use crate::domain::{Delivery, DeliverySender, SubscriptionRegistry, TransferEvent};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and applies them to the registry.
/// - Dispatches every transfer from the [`broadcast::Receiver`].
/// - Forwards each resulting delivery to the client, in dispatch order.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<TransferEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let registry = SubscriptionRegistry::new();
    let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel::<Delivery>();
    let handler = DeliverySender(delivery_tx);

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(text.as_str(), &registry, &handler);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Transfer from the feed
            event = event_rx.recv() => {
                match event {
                    Ok(transfer) => {
                        let report = registry.dispatch(&transfer).await;
                        if report.failed > 0 {
                            tracing::warn!(failed = report.failed, "ws deliveries failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind transfer feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            // Match produced by the registry
            Some(delivery) = delivery_rx.recv() => {
                let Some(json) = event_message(delivery) else {
                    continue;
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    registry.clear();
    tracing::debug!("ws connection closed");
}

fn event_message(delivery: Delivery) -> Option<String> {
    let payload = TransferMatch {
        subscription: delivery.subscription,
        transfer: delivery.event,
    };
    let msg = WsMessage::new(
        uuid::Uuid::new_v4().to_string(),
        WsMessageType::Event,
        serde_json::to_value(&payload).ok()?,
    );
    serde_json::to_string(&msg).ok()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(
    text: &str,
    registry: &SubscriptionRegistry,
    handler: &DeliverySender,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error("", 400, "malformed JSON")).ok();
    };

    let command = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(command) => command,
        Err(err) => {
            let reply = WsMessage::error(msg.id, 404, format!("unknown command: {err}"));
            return serde_json::to_string(&reply).ok();
        }
    };

    let reply = match command {
        WsCommand::Register { name, criteria } => {
            if name.trim().is_empty() {
                WsMessage::error(msg.id, 400, "subscription name is required")
            } else {
                match criteria.into_criteria() {
                    Ok(criteria) => {
                        let replaced = registry.register(name.clone(), criteria, handler.clone());
                        WsMessage::new(
                            msg.id,
                            WsMessageType::Response,
                            serde_json::json!({
                                "registered": name,
                                "replaced": replaced,
                                "count": registry.len(),
                            }),
                        )
                    }
                    Err(err) => WsMessage::error(msg.id, err.error_code(), err.to_string()),
                }
            }
        }
        WsCommand::Unregister { name } => {
            let removed = registry.unregister(&name);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unregistered": name,
                    "removed": removed,
                    "remaining_count": registry.len(),
                }),
            )
        }
        WsCommand::List => WsMessage::new(
            msg.id,
            WsMessageType::Response,
            serde_json::json!({ "subscriptions": registry.names() }),
        ),
    };
    serde_json::to_string(&reply).ok()
}

//! Ordered fan-out of observed transfers to every WebSocket connection.
//!
//! The feed only moves forward: it tracks the position of the last
//! transfer it published and refuses anything at or before it, so each
//! receiver sees a strictly increasing sequence of transfers. A receiver
//! that falls more than `capacity` transfers behind loses the oldest ones
//! and is told how many through `RecvError::Lagged`.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::domain::{TransferEvent, TransferPosition};

/// Broadcast feed of transfers in chain order.
#[derive(Debug, Clone)]
pub struct TransferFeed {
    sender: broadcast::Sender<TransferEvent>,
    position: Arc<watch::Sender<Option<TransferPosition>>>,
}

impl TransferFeed {
    /// Creates a feed buffering up to `capacity` transfers per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (position, _) = watch::channel(None);
        Self {
            sender,
            position: Arc::new(position),
        }
    }

    /// Publishes `event` if it comes after everything published so far.
    /// Returns `false` when it was refused as out of order.
    pub fn publish(&self, event: TransferEvent) -> bool {
        let position = event.position();
        let mut accepted = false;
        self.position.send_if_modified(|last| {
            if (*last).is_some_and(|prev| position <= prev) {
                return false;
            }
            *last = Some(position);
            accepted = true;
            true
        });

        if !accepted {
            tracing::warn!(
                tx = %event.transaction_hash,
                ?position,
                "refusing transfer at or before the last published position"
            );
            return false;
        }
        // No receivers only means no client is connected right now.
        let _ = self.sender.send(event);
        true
    }

    /// Publishes a batch sorted in chain order. Returns the position of
    /// the last transfer published, if any was.
    pub fn publish_batch(
        &self,
        batch: impl IntoIterator<Item = TransferEvent>,
    ) -> Option<TransferPosition> {
        let mut last = None;
        for event in batch {
            let position = event.position();
            if self.publish(event) {
                last = Some(position);
            }
        }
        last
    }

    /// Position of the last published transfer.
    #[must_use]
    pub fn position(&self) -> Option<TransferPosition> {
        *self.position.borrow()
    }

    /// Creates a receiver for every transfer published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

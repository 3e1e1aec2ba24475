//! Subscriber-side payment state driven by explicit transitions.
//!
//! A client waiting for a payment keeps a [`PaymentWatch`] and feeds it
//! [`WatchMessage`]s: its own actions and the [`Delivery`] values the
//! registry emits. State only changes through [`PaymentWatch::apply`].

use super::TransferEvent;
use super::registry::Delivery;

/// Where a payment flow currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentState {
    /// No payment requested.
    #[default]
    Idle,
    /// A payment instruction was handed out and no matching transfer has
    /// arrived yet.
    Awaiting,
    /// A matching transfer arrived.
    Paid(TransferEvent),
}

/// Input to a [`PaymentWatch`].
#[derive(Debug, Clone)]
pub enum WatchMessage {
    /// The user asked for a new payment instruction.
    Requested,
    /// The registry delivered a matched transfer.
    Delivered(Delivery),
    /// Start over.
    Reset,
}

/// Payment state for one subscription name.
#[derive(Debug, Clone)]
pub struct PaymentWatch {
    subscription: String,
    state: PaymentState,
}

impl PaymentWatch {
    /// Creates an idle watch for deliveries addressed to `subscription`.
    #[must_use]
    pub fn new(subscription: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
            state: PaymentState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &PaymentState {
        &self.state
    }

    /// Applies one message and returns the resulting state.
    ///
    /// Deliveries for other subscriptions are ignored. A delivery while
    /// idle still records the payment, since transfers may land before the
    /// client asked for a fresh instruction.
    pub fn apply(&mut self, message: WatchMessage) -> &PaymentState {
        self.state = match (std::mem::take(&mut self.state), message) {
            (_, WatchMessage::Reset) => PaymentState::Idle,
            (_, WatchMessage::Requested) => PaymentState::Awaiting,
            (state, WatchMessage::Delivered(delivery)) if delivery.subscription != self.subscription => {
                state
            }
            (_, WatchMessage::Delivered(delivery)) => PaymentState::Paid(delivery.event),
        };
        &self.state
    }
}

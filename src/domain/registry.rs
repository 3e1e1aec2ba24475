//! Named subscriptions and multicast dispatch.
//!
//! [`SubscriptionRegistry`] maps subscription names to a [`Criteria`] and a
//! [`TransferHandler`]. [`SubscriptionRegistry::dispatch`] delivers one
//! event to every subscription whose criteria match it.
//!
//! # Concurrency
//!
//! - Dispatches on one registry are serialized: every handler of one event
//!   has returned before the next dispatch starts.
//! - The subscription list is copy-on-write. A dispatch iterates the
//!   snapshot taken when it started, so `register`/`unregister` never wait
//!   for it, and calls made from inside a handler apply from the next
//!   dispatch on.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::matcher::matches;
use super::{Criteria, TransferEvent};
use crate::error::GatewayError;

/// Error returned by a subscriber handler.
pub type HandlerError = anyhow::Error;

/// Receives the transfers matched for one subscription.
///
/// Implemented for closures `Fn(&TransferEvent) -> Result<(), HandlerError>`
/// and for [`DeliverySender`]. Handlers run inline during dispatch and
/// should hand long work off to a task of their own.
pub trait TransferHandler: Send + Sync {
    /// Handles a transfer matched for `subscription`.
    ///
    /// # Errors
    ///
    /// Any error is logged by the registry and otherwise ignored.
    fn handle(&self, subscription: &str, event: &TransferEvent) -> Result<(), HandlerError>;
}

impl<F> TransferHandler for F
where
    F: Fn(&TransferEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, _subscription: &str, event: &TransferEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// A matched transfer, addressed to the subscription that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Name of the matching subscription.
    pub subscription: String,
    /// The matched transfer.
    pub event: TransferEvent,
}

/// Handler that forwards matches as [`Delivery`] messages over a channel.
#[derive(Debug, Clone)]
pub struct DeliverySender(pub mpsc::UnboundedSender<Delivery>);

impl TransferHandler for DeliverySender {
    fn handle(&self, subscription: &str, event: &TransferEvent) -> Result<(), HandlerError> {
        self.0
            .send(Delivery {
                subscription: subscription.to_string(),
                event: event.clone(),
            })
            .map_err(|_| anyhow::anyhow!("delivery receiver dropped"))
    }
}

/// One registered (criteria, handler) pair.
pub struct Subscription {
    name: String,
    criteria: Criteria,
    handler: Box<dyn TransferHandler>,
}

impl Subscription {
    /// Subscription name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Criteria the subscription was registered with.
    #[must_use]
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn invoke(&self, event: &TransferEvent) -> Result<(), GatewayError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.handler.handle(&self.name, event)));
        let reason = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(GatewayError::CallbackFailure {
            name: self.name.clone(),
            reason,
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("criteria", &self.criteria)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// Outcome of one [`SubscriptionRegistry::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscriptions whose criteria matched.
    pub matched: usize,
    /// Matched subscriptions whose handler failed.
    pub failed: usize,
}

type SubscriptionList = Arc<Vec<Arc<Subscription>>>;

/// Registry of named subscriptions for one consumer.
///
/// Iteration order is the order in which names were first registered;
/// re-registering a name replaces its entry in place.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Mutex<SubscriptionList>,
    dispatch_lock: tokio::sync::Mutex<()>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self) -> MutexGuard<'_, SubscriptionList> {
        // Critical sections never run user code, so a poisoned lock still
        // holds a consistent list.
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> SubscriptionList {
        Arc::clone(&self.list())
    }

    /// Registers `handler` under `name`, replacing any subscription with
    /// the same name. Returns `true` if one was replaced.
    pub fn register<H>(&self, name: impl Into<String>, criteria: Criteria, handler: H) -> bool
    where
        H: TransferHandler + 'static,
    {
        let name = name.into();
        if criteria.is_empty() {
            tracing::warn!(subscription = %name, "criteria has no fields and matches every transfer");
        }
        let subscription = Arc::new(Subscription {
            name: name.clone(),
            criteria,
            handler: Box::new(handler),
        });

        let mut guard = self.list();
        let list = Arc::make_mut(&mut *guard);
        let replaced = match list.iter_mut().find(|existing| existing.name == name) {
            Some(slot) => {
                *slot = subscription;
                true
            }
            None => {
                list.push(subscription);
                false
            }
        };
        drop(guard);

        tracing::debug!(subscription = %name, replaced, "registered subscription");
        replaced
    }

    /// Removes the subscription named `name`. Returns `false`, and changes
    /// nothing, if there is none.
    pub fn unregister(&self, name: &str) -> bool {
        let mut guard = self.list();
        if !guard.iter().any(|existing| existing.name == name) {
            return false;
        }
        Arc::make_mut(&mut *guard).retain(|existing| existing.name != name);
        drop(guard);

        tracing::debug!(subscription = %name, "unregistered subscription");
        true
    }

    /// Delivers `event` to every subscription whose criteria match.
    ///
    /// Handler failures and panics are logged per subscription and never
    /// stop delivery to the others.
    pub async fn dispatch(&self, event: &TransferEvent) -> DispatchReport {
        let _serial = self.dispatch_lock.lock().await;
        let snapshot = self.snapshot();

        let mut report = DispatchReport::default();
        for subscription in snapshot.iter() {
            if !matches(event, &subscription.criteria) {
                continue;
            }
            report.matched += 1;
            tracing::debug!(
                subscription = %subscription.name,
                tx = %event.transaction_hash,
                "transfer matched"
            );
            if let Err(err) = subscription.invoke(event) {
                report.failed += 1;
                tracing::warn!(error = %err, tx = %event.transaction_hash, "subscription handler failed");
            }
        }
        report
    }

    /// Returns `true` if a subscription named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.list().iter().any(|existing| existing.name == name)
    }

    /// Names of all subscriptions, in iteration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.list().iter().map(|s| s.name.clone()).collect()
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        *self.list() = Arc::new(Vec::new());
    }
}

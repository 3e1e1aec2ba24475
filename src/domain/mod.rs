//! Domain layer: transfers, criteria, matching, and subscription dispatch.
//!
//! This module contains the transport-agnostic core: the normalized
//! transfer event, the fixed-point amount codec, the criteria language
//! and matcher, the subscription registry, and payment helpers.

pub mod amount;
pub mod criteria;
pub mod matcher;
pub mod payment;
pub mod payment_watch;
pub mod registry;
pub mod transfer_event;

pub use criteria::{Criteria, CriteriaSpec, DataMatch};
pub use matcher::matches;
pub use payment::PaymentRequest;
pub use payment_watch::{PaymentState, PaymentWatch, WatchMessage};
pub use registry::{
    Delivery, DeliverySender, DispatchReport, HandlerError, SubscriptionRegistry,
    TransferHandler,
};
pub use transfer_event::{TransferEvent, TransferPosition};

//! Data Transfer Objects for REST request/response serialization.
//!
//! Token values in fixed-point form are serialized as JSON strings to
//! prevent precision loss.

pub mod payment_dto;
pub mod transfer_dto;

pub use payment_dto::*;
pub use transfer_dto::*;

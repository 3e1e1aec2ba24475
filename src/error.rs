//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid amount: -1",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request           |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Amount is negative, fractional or not a number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A criteria builder was called without the recipient it requires.
    #[error("missing recipient")]
    MissingRecipient,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Address is not a 20-byte hex string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A subscriber handler failed during dispatch.
    ///
    /// Only ever logged by the registry; dispatch never returns it.
    #[error("handler for subscription {name} failed: {reason}")]
    CallbackFailure {
        /// Subscription name.
        name: String,
        /// Error or panic message reported by the handler.
        reason: String,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidAmount(_) => 1001,
            Self::MissingRecipient => 1002,
            Self::InvalidRequest(_) => 1003,
            Self::InvalidAddress(_) => 1004,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::CallbackFailure { .. } => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount(_)
            | Self::MissingRecipient
            | Self::InvalidRequest(_)
            | Self::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            Self::CallbackFailure { .. } | Self::PersistenceError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        assert_eq!(
            GatewayError::InvalidAmount("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::MissingRecipient.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn callback_failure_message_names_subscription() {
        let err = GatewayError::CallbackFailure {
            name: "random-generator".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.error_code(), 3002);
        assert!(err.to_string().contains("random-generator"));
    }

    #[test]
    fn into_response_sets_status() {
        let response = GatewayError::PersistenceError("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

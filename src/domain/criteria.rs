//! Declarative transfer filters and their builders.
//!
//! A [`Criteria`] describes the transfer a subscriber is waiting for. Every
//! field is optional and a missing field matches anything, so an empty
//! `Criteria` matches every event. [`CriteriaSpec`] is the closure-free
//! form accepted from WebSocket clients.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TransferEvent;
use super::amount;
use crate::error::GatewayError;

/// Predicate over the `data` field of a transfer.
pub type DataPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate over a whole transfer.
pub type EventValidator = Arc<dyn Fn(&TransferEvent) -> bool + Send + Sync>;

/// Rule applied to the `data` field of a transfer.
#[derive(Clone)]
pub enum DataMatch {
    /// `data` must equal the string.
    Exact(String),
    /// `data` must equal or contain the string, so a filter on `appId`
    /// also accepts `appId:customPayload`.
    Contains(String),
    /// `data` must satisfy the predicate.
    Predicate(DataPredicate),
}

impl DataMatch {
    /// Builds a [`DataMatch::Predicate`] from a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Applies the rule to an event's `data`. Absent data never matches.
    #[must_use]
    pub fn matches(&self, data: Option<&str>) -> bool {
        let Some(data) = data else {
            return false;
        };
        match self {
            Self::Exact(expected) => data == expected,
            Self::Contains(needle) => data == needle || data.contains(needle.as_str()),
            Self::Predicate(predicate) => predicate(data),
        }
    }
}

impl fmt::Debug for DataMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// Matching rule for one subscription.
#[derive(Clone, Default)]
pub struct Criteria {
    /// Required recipient address.
    pub recipient: Option<String>,
    /// Required sender address.
    pub sender: Option<String>,
    /// Required fixed-point amount string.
    pub expected_amount: Option<String>,
    /// Rule for the `data` field.
    pub data: Option<DataMatch>,
    /// Arbitrary check over the whole event, run last.
    pub validator: Option<EventValidator>,
}

impl Criteria {
    /// Criteria with no fields set. Matches every event.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Requires the given recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Requires the given sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Requires the given fixed-point amount string.
    #[must_use]
    pub fn with_expected_amount(mut self, amount: impl Into<String>) -> Self {
        self.expected_amount = Some(amount.into());
        self
    }

    /// Sets the `data` rule.
    #[must_use]
    pub fn with_data(mut self, data: DataMatch) -> Self {
        self.data = Some(data);
        self
    }

    /// Requires `data` to equal or contain `needle`.
    #[must_use]
    pub fn with_data_contains(self, needle: impl Into<String>) -> Self {
        self.with_data(DataMatch::Contains(needle.into()))
    }

    /// Sets the whole-event validator.
    #[must_use]
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&TransferEvent) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipient.is_none()
            && self.sender.is_none()
            && self.expected_amount.is_none()
            && self.data.is_none()
            && self.validator.is_none()
    }

    /// Payment of `amount` whole tokens to `recipient` tagged with `app_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingRecipient`] if `recipient` is empty.
    pub fn app_payment(app_id: &str, amount: u64, recipient: &str) -> Result<Self, GatewayError> {
        let recipient = require_recipient(recipient)?;
        Ok(Self::any()
            .with_recipient(recipient)
            .with_expected_amount(amount::to_fixed_point_u64(amount))
            .with_data_contains(app_id))
    }

    /// Like [`Criteria::app_payment`], additionally pinned to one sender.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingRecipient`] if `recipient` is empty.
    pub fn user_payment(
        sender: &str,
        amount: u64,
        app_id: &str,
        recipient: &str,
    ) -> Result<Self, GatewayError> {
        Ok(Self::app_payment(app_id, amount, recipient)?.with_sender(sender))
    }

    /// Any amount to `recipient` tagged with `app_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingRecipient`] if `recipient` is empty.
    pub fn any_app_payment(app_id: &str, recipient: &str) -> Result<Self, GatewayError> {
        let recipient = require_recipient(recipient)?;
        Ok(Self::any()
            .with_recipient(recipient)
            .with_data_contains(app_id))
    }

    /// Transfers to `recipient` accepted by a custom validator.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingRecipient`] if `recipient` is empty.
    pub fn custom<F>(recipient: &str, validator: F) -> Result<Self, GatewayError>
    where
        F: Fn(&TransferEvent) -> bool + Send + Sync + 'static,
    {
        let recipient = require_recipient(recipient)?;
        Ok(Self::any()
            .with_recipient(recipient)
            .with_validator(validator))
    }
}

fn require_recipient(recipient: &str) -> Result<&str, GatewayError> {
    if recipient.trim().is_empty() {
        return Err(GatewayError::MissingRecipient);
    }
    Ok(recipient)
}

impl fmt::Debug for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("recipient", &self.recipient)
            .field("sender", &self.sender)
            .field("expected_amount", &self.expected_amount)
            .field("data", &self.data)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Serializable criteria sent by WebSocket clients.
///
/// Empty strings count as absent. Addresses are lowercased to match the
/// form stored by the indexer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CriteriaSpec {
    /// Required recipient address.
    #[serde(default)]
    pub recipient: Option<String>,
    /// Required sender address.
    #[serde(default)]
    pub sender: Option<String>,
    /// Required fixed-point amount string.
    #[serde(default)]
    pub expected_amount: Option<String>,
    /// Required amount in whole tokens; encoded server-side.
    #[serde(default)]
    pub amount: Option<String>,
    /// Data filter.
    #[serde(default)]
    pub data: Option<String>,
    /// When `true`, `data` must match exactly instead of by substring.
    #[serde(default)]
    pub data_exact: bool,
}

impl CriteriaSpec {
    /// Converts the wire form into a [`Criteria`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAmount`] if `amount` is not a whole
    /// number, or [`GatewayError::InvalidRequest`] if both `amount` and
    /// `expected_amount` are given.
    pub fn into_criteria(self) -> Result<Criteria, GatewayError> {
        let expected_from_count = non_empty(self.amount)
            .map(|count| amount::to_fixed_point(&count))
            .transpose()?;
        let expected_amount = match (non_empty(self.expected_amount), expected_from_count) {
            (Some(_), Some(_)) => {
                return Err(GatewayError::InvalidRequest(
                    "give either amount or expected_amount, not both".to_string(),
                ));
            }
            (Some(encoded), None) => {
                if !encoded.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(GatewayError::InvalidAmount(encoded));
                }
                Some(encoded)
            }
            (None, from_count) => from_count,
        };

        let data = non_empty(self.data).map(|data| {
            if self.data_exact {
                DataMatch::Exact(data)
            } else {
                DataMatch::Contains(data)
            }
        });

        Ok(Criteria {
            recipient: non_empty(self.recipient).map(|a| a.to_lowercase()),
            sender: non_empty(self.sender).map(|a| a.to_lowercase()),
            expected_amount,
            data,
            validator: None,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0xf48554937f18885c7f15c432c596b5843648231d";

    #[test]
    fn contains_accepts_equal_and_suffixed() {
        let rule = DataMatch::Contains("appX".to_string());
        assert!(rule.matches(Some("appX")));
        assert!(rule.matches(Some("appX:foo")));
        assert!(!rule.matches(Some("appY")));
        assert!(!rule.matches(None));
    }

    #[test]
    fn exact_rejects_suffixed() {
        let rule = DataMatch::Exact("appX".to_string());
        assert!(rule.matches(Some("appX")));
        assert!(!rule.matches(Some("appX:foo")));
    }

    #[test]
    fn predicate_never_sees_absent_data() {
        let rule = DataMatch::predicate(|_| true);
        assert!(rule.matches(Some("")));
        assert!(!rule.matches(None));
    }

    #[test]
    fn app_payment_encodes_amount() {
        let Ok(criteria) = Criteria::app_payment("random-number", 1, RECIPIENT) else {
            panic!("builder failed");
        };
        assert_eq!(criteria.recipient.as_deref(), Some(RECIPIENT));
        assert_eq!(
            criteria.expected_amount.as_deref(),
            Some("1000000000000000000")
        );
        assert!(matches!(criteria.data, Some(DataMatch::Contains(ref s)) if s == "random-number"));
        assert!(criteria.sender.is_none());
    }

    #[test]
    fn user_payment_sets_sender() {
        let Ok(criteria) = Criteria::user_payment("0xdef", 5, "shop", RECIPIENT) else {
            panic!("builder failed");
        };
        assert_eq!(criteria.sender.as_deref(), Some("0xdef"));
        assert_eq!(
            criteria.expected_amount.as_deref(),
            Some("5000000000000000000")
        );
    }

    #[test]
    fn builders_require_recipient() {
        assert!(matches!(
            Criteria::app_payment("a", 1, ""),
            Err(GatewayError::MissingRecipient)
        ));
        assert!(matches!(
            Criteria::user_payment("0xdef", 1, "a", "  "),
            Err(GatewayError::MissingRecipient)
        ));
        assert!(matches!(
            Criteria::any_app_payment("a", ""),
            Err(GatewayError::MissingRecipient)
        ));
        assert!(matches!(
            Criteria::custom("", |_| true),
            Err(GatewayError::MissingRecipient)
        ));
    }

    #[test]
    fn any_is_empty() {
        assert!(Criteria::any().is_empty());
        assert!(!Criteria::any().with_sender("0x1").is_empty());
    }

    #[test]
    fn spec_encodes_whole_amount() {
        let spec = CriteriaSpec {
            recipient: Some("0xABC".to_string()),
            amount: Some("2".to_string()),
            data: Some("random-number".to_string()),
            ..CriteriaSpec::default()
        };
        let Ok(criteria) = spec.into_criteria() else {
            panic!("conversion failed");
        };
        assert_eq!(criteria.recipient.as_deref(), Some("0xabc"));
        assert_eq!(
            criteria.expected_amount.as_deref(),
            Some("2000000000000000000")
        );
        assert!(matches!(criteria.data, Some(DataMatch::Contains(_))));
    }

    #[test]
    fn spec_treats_blank_fields_as_absent() {
        let spec = CriteriaSpec {
            recipient: Some(String::new()),
            data: Some("  ".to_string()),
            ..CriteriaSpec::default()
        };
        let Ok(criteria) = spec.into_criteria() else {
            panic!("conversion failed");
        };
        assert!(criteria.is_empty());
    }

    #[test]
    fn spec_rejects_bad_amounts() {
        let negative = CriteriaSpec {
            amount: Some("-1".to_string()),
            ..CriteriaSpec::default()
        };
        assert!(matches!(
            negative.into_criteria(),
            Err(GatewayError::InvalidAmount(_))
        ));

        let both = CriteriaSpec {
            amount: Some("1".to_string()),
            expected_amount: Some("1000000000000000000".to_string()),
            ..CriteriaSpec::default()
        };
        assert!(matches!(
            both.into_criteria(),
            Err(GatewayError::InvalidRequest(_))
        ));

        let encoded_garbage = CriteriaSpec {
            expected_amount: Some("1.5".to_string()),
            ..CriteriaSpec::default()
        };
        assert!(matches!(
            encoded_garbage.into_criteria(),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn spec_exact_flag() {
        let spec = CriteriaSpec {
            data: Some("app".to_string()),
            data_exact: true,
            ..CriteriaSpec::default()
        };
        let Ok(criteria) = spec.into_criteria() else {
            panic!("conversion failed");
        };
        assert!(matches!(criteria.data, Some(DataMatch::Exact(_))));
    }
}

//! Transfer-against-criteria matching.

use super::{Criteria, TransferEvent};

/// Returns `true` if `event` satisfies every clause present in `criteria`.
///
/// Clauses run in a fixed order and stop at the first failure: recipient,
/// sender, amount, data, then the validator. Addresses and amounts compare
/// as exact strings; the amount is never parsed. A criteria with no
/// clauses matches everything.
#[must_use]
pub fn matches(event: &TransferEvent, criteria: &Criteria) -> bool {
    if let Some(recipient) = &criteria.recipient
        && event.recipient != *recipient
    {
        return false;
    }

    if let Some(sender) = &criteria.sender
        && event.sender != *sender
    {
        return false;
    }

    if let Some(amount) = &criteria.expected_amount
        && event.amount != *amount
    {
        return false;
    }

    if let Some(data) = &criteria.data
        && !data.matches(event.data.as_deref())
    {
        return false;
    }

    criteria
        .validator
        .as_ref()
        .is_none_or(|validator| validator(event))
}

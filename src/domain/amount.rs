//! Fixed-point token amount codec.
//!
//! On the wire a token amount is an unsigned decimal integer string scaled
//! by `10^18` ("1 token" is `"1000000000000000000"`). Values are held as
//! [`U256`], the width of an ERC-20 amount, so encoding is exact for every
//! amount a transfer can carry. Matching always compares the encoded
//! strings byte-for-byte.

use alloy::primitives::U256;

use crate::error::GatewayError;

/// Number of implied decimal places in a fixed-point amount.
pub const TOKEN_DECIMALS: u8 = 18;

/// `10^TOKEN_DECIMALS`.
#[must_use]
pub fn scale() -> U256 {
    U256::from(10u8).pow(U256::from(TOKEN_DECIMALS))
}

fn parse_unsigned(raw: &str) -> Result<U256, GatewayError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::InvalidAmount(raw.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| GatewayError::InvalidAmount(raw.to_string()))
}

/// Encodes a whole token count as a fixed-point amount.
///
/// Surrounding whitespace and leading zeros are ignored.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAmount`] when `count` is empty, negative,
/// fractional, contains anything other than ASCII digits, or scales past
/// 256 bits.
pub fn to_fixed_point_value(count: &str) -> Result<U256, GatewayError> {
    parse_unsigned(count)?
        .checked_mul(scale())
        .ok_or_else(|| GatewayError::InvalidAmount(count.to_string()))
}

/// Encodes a whole token count as a fixed-point amount string.
///
/// `"0"` encodes to `"0"`.
///
/// # Errors
///
/// Same as [`to_fixed_point_value`].
pub fn to_fixed_point(count: &str) -> Result<String, GatewayError> {
    to_fixed_point_value(count).map(|value| value.to_string())
}

/// Encodes a whole token count held in a `u64`.
#[must_use]
pub fn to_fixed_point_u64(count: u64) -> String {
    U256::from(count).saturating_mul(scale()).to_string()
}

/// Decodes a fixed-point amount to whole tokens, rounding down.
///
/// Lossy and meant for display only.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAmount`] when `encoded` is not an
/// unsigned decimal integer string that fits in 256 bits.
pub fn from_fixed_point(encoded: &str) -> Result<U256, GatewayError> {
    Ok(parse_unsigned(encoded)? / scale())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn one_token() {
        assert_eq!(to_fixed_point("1").ok().as_deref(), Some("1000000000000000000"));
        assert_eq!(to_fixed_point_u64(1), "1000000000000000000");
        assert_eq!(to_fixed_point_value("1").ok(), Some(scale()));
    }

    #[test]
    fn five_tokens() {
        assert_eq!(to_fixed_point("5").ok().as_deref(), Some("5000000000000000000"));
        assert_eq!(to_fixed_point_u64(5), "5000000000000000000");
    }

    #[test]
    fn zero_and_leading_zeros() {
        assert_eq!(to_fixed_point("0").ok().as_deref(), Some("0"));
        assert_eq!(to_fixed_point("000").ok().as_deref(), Some("0"));
        assert_eq!(to_fixed_point_u64(0), "0");
        assert_eq!(to_fixed_point(" 007 ").ok().as_deref(), Some("7000000000000000000"));
    }

    #[test]
    fn beyond_u64_is_exact() {
        let count = "123456789012345678901234567890";
        let Ok(encoded) = to_fixed_point(count) else {
            panic!("valid count rejected");
        };
        assert_eq!(encoded, format!("{count}000000000000000000"));
    }

    #[test]
    fn u64_max_matches_string_path() {
        let from_str = to_fixed_point(&u64::MAX.to_string()).ok();
        assert_eq!(from_str, Some(to_fixed_point_u64(u64::MAX)));
    }

    #[test]
    fn rejects_non_whole_numbers() {
        for bad in ["", "  ", "-1", "1.5", "1e18", "abc", "+3", "0x10", "1_000"] {
            let result = to_fixed_point(bad);
            let Err(GatewayError::InvalidAmount(raw)) = result else {
                panic!("expected InvalidAmount for {bad:?}");
            };
            assert_eq!(raw, bad);
        }
    }

    #[test]
    fn rejects_counts_past_256_bits() {
        let count = "9".repeat(70);
        assert!(matches!(
            to_fixed_point(&count),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn decode_floors() {
        assert_eq!(from_fixed_point("1000000000000000000").ok(), Some(U256::from(1u8)));
        assert_eq!(from_fixed_point("1999999999999999999").ok(), Some(U256::from(1u8)));
        assert_eq!(from_fixed_point("999999999999999999").ok(), Some(U256::ZERO));
        assert_eq!(from_fixed_point("0").ok(), Some(U256::ZERO));
    }

    #[test]
    fn decode_inverts_encode() {
        let count = "98765432109876543210";
        let Ok(encoded) = to_fixed_point(count) else {
            panic!("valid count rejected");
        };
        assert_eq!(
            from_fixed_point(&encoded).ok().map(|v| v.to_string()).as_deref(),
            Some(count)
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(from_fixed_point("1.0").is_err());
        assert!(from_fixed_point("").is_err());
        assert!(from_fixed_point(&"9".repeat(90)).is_err());
    }
}

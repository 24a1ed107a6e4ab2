//! Minor-unit amount arithmetic.
//!
//! All on-chain amounts are integers in the asset's smallest unit.
//! Percentages arrive as `Decimal` and are applied with exact integer
//! math (widened to `U256`), truncating toward zero so a computed
//! deposit or redemption is never rounded up past what the wallet holds.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::{AgentError, Result};

/// Percentage at or above which a redemption is treated as "everything".
pub const FULL_REDEMPTION_THRESHOLD: Decimal = dec!(99.99);

/// Minor units shaved off a full redemption to absorb upstream rounding.
pub const FULL_REDEMPTION_HAIRCUT: u128 = 1;

/// Reject percentages outside `(0, 100]`.
pub fn validate_percentage(percentage: Decimal) -> Result<()> {
    if percentage <= Decimal::ZERO || percentage > dec!(100) {
        return Err(AgentError::InvalidArgument(format!(
            "percentage must be in (0, 100], got {percentage}"
        )));
    }
    Ok(())
}

/// `balance × percentage / 100`, truncated toward zero.
///
/// Exact for any `Decimal` percentage: the mantissa and scale are
/// applied as integers so no intermediate float or decimal rounding
/// can push the result up.
pub fn share_of(balance_minor: u128, percentage: Decimal) -> Result<u128> {
    validate_percentage(percentage)?;

    let mantissa = u128::try_from(percentage.mantissa()).map_err(|_| {
        AgentError::InvalidArgument(format!("percentage {percentage} is negative"))
    })?;
    let denominator = U256::from(100u8) * U256::from(10u8).pow(U256::from(percentage.scale()));

    let share = U256::from(balance_minor) * U256::from(mantissa) / denominator;

    // share <= balance because percentage <= 100
    u128::try_from(share).map_err(|_| {
        AgentError::InvalidArgument(format!("share of {balance_minor} overflowed"))
    })
}

/// Whether a redemption percentage counts as a full exit.
pub fn is_full_redemption(percentage: Decimal) -> bool {
    percentage >= FULL_REDEMPTION_THRESHOLD
}

/// Amount to request from the redeem endpoint.
///
/// Full redemptions request `balance - 1` so upstream share/asset
/// rounding cannot make the vault revert on an over-withdrawal.
pub fn redeem_amount(balance_minor: u128, percentage: Decimal) -> Result<u128> {
    validate_percentage(percentage)?;
    if is_full_redemption(percentage) {
        return Ok(balance_minor.saturating_sub(FULL_REDEMPTION_HAIRCUT));
    }
    share_of(balance_minor, percentage)
}

/// Convert minor units into a human-readable decimal.
///
/// Returns `None` when the value does not fit a 96-bit decimal mantissa.
pub fn to_decimal(amount_minor: u128, decimals: u32) -> Option<Decimal> {
    let signed = i128::try_from(amount_minor).ok()?;
    Decimal::try_from_i128_with_scale(signed, decimals).ok()
}

/// Convert a decimal asset value into minor units, truncating extra precision.
pub fn to_minor_units(value: Decimal, decimals: u32) -> Option<u128> {
    if value.is_sign_negative() {
        return None;
    }
    let factor = Decimal::from_i128_with_scale(10i128.checked_pow(decimals)?, 0);
    value.checked_mul(factor)?.trunc().to_u128()
}

/// Parse an integer amount transmitted as a decimal string.
pub fn parse_minor_units(raw: &str) -> Option<u128> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_truncates_toward_zero() {
        // 10% of 100.000001 USDC
        assert_eq!(share_of(100_000_001, dec!(10)).unwrap(), 10_000_000);
        // 33.33% of 1 minor unit
        assert_eq!(share_of(1, dec!(33.33)).unwrap(), 0);
        assert_eq!(share_of(999, dec!(50)).unwrap(), 499);
    }

    #[test]
    fn test_share_of_full_balance() {
        assert_eq!(share_of(123_456_789, dec!(100)).unwrap(), 123_456_789);
    }

    #[test]
    fn test_share_with_fractional_percentage() {
        // 12.5% of 80 USDC = 10 USDC
        assert_eq!(share_of(80_000_000, dec!(12.5)).unwrap(), 10_000_000);
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage(dec!(0)).is_err());
        assert!(validate_percentage(dec!(-5)).is_err());
        assert!(validate_percentage(dec!(100.01)).is_err());
        assert!(validate_percentage(dec!(0.0001)).is_ok());
        assert!(validate_percentage(dec!(100)).is_ok());
    }

    #[test]
    fn test_full_redemption_subtracts_one_unit() {
        assert_eq!(redeem_amount(5_000_000, dec!(100)).unwrap(), 4_999_999);
        assert_eq!(redeem_amount(5_000_000, dec!(99.99)).unwrap(), 4_999_999);
        assert_eq!(redeem_amount(0, dec!(100)).unwrap(), 0);
    }

    #[test]
    fn test_partial_redemption_is_plain_share() {
        assert_eq!(redeem_amount(5_000_000, dec!(50)).unwrap(), 2_500_000);
        assert_eq!(redeem_amount(5_000_000, dec!(99.98)).unwrap(), 4_999_000);
    }

    #[test]
    fn test_decimal_conversions() {
        assert_eq!(to_decimal(10_500_000, 6).unwrap(), dec!(10.5));
        assert_eq!(to_minor_units(dec!(0.10), 6).unwrap(), 100_000);
        assert_eq!(to_minor_units(dec!(1.2345678), 6).unwrap(), 1_234_567);
        assert!(to_minor_units(dec!(-1), 6).is_none());
    }

    #[test]
    fn test_parse_minor_units() {
        assert_eq!(parse_minor_units("1000000"), Some(1_000_000));
        assert_eq!(parse_minor_units(" 42 "), Some(42));
        assert_eq!(parse_minor_units("1.5"), None);
        assert_eq!(parse_minor_units("-1"), None);
        assert_eq!(parse_minor_units(""), None);
    }
}

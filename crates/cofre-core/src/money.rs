//! Monetary value conversions
//!
//! Money is stored as integer cents in SQLite so that balances and invoice
//! totals can be mutated with plain `x = x + ?` deltas inside a transaction.
//! The API boundary speaks `rust_decimal::Decimal` with at most two
//! fractional digits.

use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Convert a decimal amount to integer cents.
///
/// Rejects amounts with more than two decimal places and amounts that do
/// not fit an `i64` after scaling.
pub fn to_cents(value: Decimal) -> Result<i64> {
    let scaled = value * Decimal::from(100);
    if scaled.fract() != Decimal::ZERO {
        return Err(Error::Validation(format!(
            "Amount {} has more than two decimal places",
            value
        )));
    }
    scaled
        .trunc()
        .try_into()
        .map_err(|_| Error::Validation(format!("Amount {} is out of range", value)))
}

/// Convert a decimal amount to cents, requiring it to be strictly positive.
pub fn to_positive_cents(value: Decimal) -> Result<i64> {
    let cents = to_cents(value)?;
    if cents <= 0 {
        return Err(Error::Validation(format!(
            "Amount must be a positive value, got {}",
            value
        )));
    }
    Ok(cents)
}

/// Convert integer cents back to a decimal with two fractional digits.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_cents_exact() {
        assert_eq!(to_cents(dec("150.00")).unwrap(), 15000);
        assert_eq!(to_cents(dec("0.01")).unwrap(), 1);
        assert_eq!(to_cents(dec("33.34")).unwrap(), 3334);
        assert_eq!(to_cents(dec("2200")).unwrap(), 220000);
        assert_eq!(to_cents(dec("-5.50")).unwrap(), -550);
    }

    #[test]
    fn test_to_cents_rejects_sub_cent() {
        assert!(to_cents(dec("0.001")).is_err());
        assert!(to_cents(dec("10.999")).is_err());
    }

    #[test]
    fn test_to_positive_cents() {
        assert_eq!(to_positive_cents(dec("1.00")).unwrap(), 100);
        assert!(to_positive_cents(dec("0")).is_err());
        assert!(to_positive_cents(dec("-1.00")).is_err());
    }

    #[test]
    fn test_from_cents_round_trip() {
        for cents in [0i64, 1, 99, 100, 15000, 123_456_789] {
            assert_eq!(to_cents(from_cents(cents)).unwrap(), cents);
        }
        assert_eq!(from_cents(15000), dec("150.00"));
        assert_eq!(from_cents(1), dec("0.01"));
    }
}

//! Money helpers.
//!
//! Amounts are stored as rupees in [`Decimal`] with two fractional digits.
//! The payment gateway works in paise (integer hundredths), so conversions
//! happen at that boundary only.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;

/// The only currency the store sells in.
pub const CURRENCY: &str = "INR";

/// Convert a rupee amount to integer paise, rounding half away from zero.
///
/// Returns `None` if the value does not fit in an `i64`.
#[must_use]
pub fn to_paise(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert integer paise to a rupee amount.
#[must_use]
pub fn from_paise(paise: i64) -> Decimal {
    Decimal::new(paise, 2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_to_paise() {
        assert_eq!(to_paise(Decimal::from_str("499.99").unwrap()), Some(49_999));
        assert_eq!(to_paise(Decimal::from(1500)), Some(150_000));
        assert_eq!(to_paise(Decimal::from_str("0.005").unwrap()), Some(1));
    }

    #[test]
    fn test_from_paise() {
        assert_eq!(from_paise(49_999).to_string(), "499.99");
        assert_eq!(from_paise(0), Decimal::ZERO);
    }
}

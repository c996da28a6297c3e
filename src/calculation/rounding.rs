//! Rounding helpers for monetary amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to two decimal places, halves away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
/// use tax_rule_engine::calculation::round_cents;
///
/// assert_eq!(round_cents(Decimal::from_str("123.455").unwrap()), Decimal::from_str("123.46").unwrap());
/// assert_eq!(round_cents(Decimal::from_str("123.454").unwrap()), Decimal::from_str("123.45").unwrap());
/// ```
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to whole currency units, halves away from zero.
pub fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_cents_at_midpoint_rounds_up() {
        assert_eq!(round_cents(dec("0.005")), dec("0.01"));
    }

    #[test]
    fn test_round_cents_preserves_rounded_values() {
        assert_eq!(round_cents(dec("5563.40")), dec("5563.40"));
    }

    #[test]
    fn test_round_units() {
        assert_eq!(round_units(dec("1408.5")), dec("1409"));
        assert_eq!(round_units(dec("1408.49")), dec("1408"));
        assert_eq!(round_units(dec("2000")), dec("2000"));
    }
}

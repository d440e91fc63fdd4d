//! Value objects shared across the domain.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StorefrontError;

/// A discount percentage in `[0, 100]`.
///
/// The store historically carried discounts as free-text labels such as
/// `"10% OFF"`; the structured form is canonical everywhere inside the
/// service, and [`Percent::parse_label`] is the only place the label format
/// is understood.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub fn new(value: Decimal) -> crate::Result<Self> {
        if value < Decimal::ZERO || value > Decimal::from(100) {
            return Err(StorefrontError::InvalidDiscountFormat(format!(
                "percentage out of range: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Parses a legacy discount label: a leading numeric percentage with any
    /// trailing text stripped (`"10% OFF"` -> 10). Rejects input without a
    /// parsable leading number instead of letting garbage propagate.
    pub fn parse_label(label: &str) -> crate::Result<Self> {
        let trimmed = label.trim();
        let numeric: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let value: Decimal = numeric
            .parse()
            .map_err(|_| StorefrontError::InvalidDiscountFormat(label.to_string()))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `base - base * pct / 100`, at full precision.
    pub fn apply_to(&self, base: Decimal) -> Decimal {
        base - base * self.0 / Decimal::from(100)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% OFF", self.0)
    }
}

/// Rounds a monetary amount to two decimal places. Applied only when an
/// amount is persisted or rendered; intermediate arithmetic keeps full
/// precision.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_label_strips_suffix() {
        let pct = Percent::parse_label("10% OFF").unwrap();
        assert_eq!(pct.value(), Decimal::from(10));
        let pct = Percent::parse_label("12.5 percent off").unwrap();
        assert_eq!(pct.value(), Decimal::new(125, 1));
    }

    #[test]
    fn parse_label_rejects_garbage() {
        assert!(matches!(
            Percent::parse_label("% OFF"),
            Err(StorefrontError::InvalidDiscountFormat(_))
        ));
        assert!(Percent::parse_label("SALE").is_err());
        assert!(Percent::parse_label("").is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Percent::new(Decimal::from(101)).is_err());
        assert!(Percent::new(Decimal::from(-1)).is_err());
        assert!(Percent::new(Decimal::from(100)).is_ok());
        assert!(Percent::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn apply_to_discounts() {
        let pct = Percent::parse_label("20% OFF").unwrap();
        assert_eq!(pct.apply_to(Decimal::from(50)), Decimal::from(40));
    }

    #[test]
    fn round_money_two_places() {
        assert_eq!(round_money(Decimal::new(32, 1)), Decimal::new(320, 2));
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
    }
}

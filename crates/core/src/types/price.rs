//! Non-negative prices using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// A catalog or line-item price in the store's single currency.
///
/// Always `>= 0`. Serialized as a decimal string so no precision is lost on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` if the amount is negative.
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::invalid("price", "must be a number ≥ 0"));
        }
        Ok(Self(amount))
    }

    /// Parse a price from user input such as `"19.99"` or `"1000"`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` if the text is not a decimal number
    /// or is negative.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let amount: Decimal = text
            .trim()
            .parse()
            .map_err(|_| ValidationError::invalid("price", "must be a number ≥ 0"))?;
        Self::new(amount)
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × qty`, or `None` when the result does not fit a `Decimal`.
    #[must_use]
    pub fn checked_mul(self, qty: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(qty))
    }
}


impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_prices() {
        assert_eq!(Price::parse("1000").unwrap().amount(), Decimal::from(1000));
        assert_eq!(Price::parse(" 19.99 ").unwrap().to_string(), "19.99");
        assert_eq!(Price::parse("0").unwrap(), Price::ZERO);
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!(Price::parse("-1").is_err());
        assert!(Price::parse("abc").is_err());
        assert!(Price::parse("").is_err());
    }

    #[test]
    fn test_multiply_by_quantity() {
        let price = Price::parse("12.50").unwrap();
        assert_eq!(price.checked_mul(4), Some(Decimal::from(50)));
    }

    #[test]
    fn test_multiply_overflow_is_none() {
        let price = Price::new(Decimal::MAX).unwrap();
        assert_eq!(price.checked_mul(1), Some(Decimal::MAX));
        assert_eq!(price.checked_mul(2), None);
    }
}

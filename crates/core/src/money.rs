//! Non-negative, currency-agnostic decimal amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A non-negative decimal amount (unit price or cart total).
///
/// Decimal arithmetic keeps running cart totals exact; `0.1 + 0.2` stays `0.3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Build a price, rejecting negative amounts.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "price cannot be negative (got {amount})"
            )));
        }
        Ok(Self(amount.normalize()))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum of two amounts, or `None` when it exceeds what `Decimal` can hold.
    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(|sum| Price(sum.normalize()))
    }
}

impl ValueObject for Price {}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rejects_negative_amounts() {
        let err = Price::new(dec("-0.01")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn accepts_zero_and_negative_zero() {
        assert!(Price::new(Decimal::ZERO).unwrap().is_zero());
        assert!(Price::new(dec("-0.00")).unwrap().is_zero());
    }

    #[test]
    fn addition_is_exact() {
        let total = Price::new(dec("0.1"))
            .unwrap()
            .checked_add(Price::new(dec("0.2")).unwrap())
            .unwrap();
        assert_eq!(total.amount(), dec("0.3"));
    }

    #[test]
    fn running_totals_accumulate() {
        let total = ["299.99", "1299.99", "155.49"]
            .iter()
            .map(|p| Price::new(dec(p)).unwrap())
            .try_fold(Price::ZERO, Price::checked_add)
            .unwrap();
        assert_eq!(total.amount(), dec("1755.47"));
    }

    #[test]
    fn overflowing_sum_is_none() {
        let max = Price::new(Decimal::MAX).unwrap();
        assert_eq!(max.checked_add(Price::ZERO), Some(max));
        assert_eq!(max.checked_add(max), None);
    }

    #[test]
    fn deserialization_validates_sign() {
        assert!(serde_json::from_str::<Price>("\"12.50\"").is_ok());
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}

use crate::error::StoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strictly positive unit price.
///
/// Wraps `rust_decimal::Decimal` so that a variant can never be priced at or
/// below zero, and so that an `OrderItem` carries the exact value it was sold at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, StoreError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(StoreError::ValidationError(
                "Price must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Line subtotal for `quantity` units at this price.
    pub fn times(self, quantity: u32) -> Result<Money, StoreError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(overflow)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = StoreError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self(price.0)
    }
}

/// A monetary total. Arithmetic is exact decimal, never floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, StoreError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(overflow)
    }

    /// Sums `amounts`, failing on the first error or on overflow.
    pub fn total<I>(amounts: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = Result<Self, StoreError>>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount?))
    }
}

fn overflow() -> StoreError {
    StoreError::ValidationError("Monetary amount overflow".to_string())
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Price::new(dec!(0.0)),
            Err(StoreError::ValidationError(_))
        ));
        assert!(matches!(
            Price::new(dec!(-3.5)),
            Err(StoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_price_times_quantity_is_exact() {
        let price = Price::new(dec!(0.10)).unwrap();
        assert_eq!(price.times(3).unwrap(), Money::new(dec!(0.30)));
    }

    #[test]
    fn test_price_times_overflow_is_an_error() {
        let price = Price::new(Decimal::MAX).unwrap();
        assert!(price.times(1).is_ok());
        assert!(matches!(
            price.times(2),
            Err(StoreError::ValidationError(msg)) if msg.contains("overflow")
        ));
    }

    #[test]
    fn test_money_sum() {
        let total = Money::total(
            [dec!(20.00), dec!(25.00), dec!(0.01)]
                .into_iter()
                .map(|d| Ok(Money::new(d))),
        )
        .unwrap();
        assert_eq!(total, Money::new(dec!(45.01)));
    }

    #[test]
    fn test_money_total_overflow_is_an_error() {
        let amounts = [Decimal::MAX, Decimal::ONE].into_iter().map(|d| Ok(Money::new(d)));
        assert!(matches!(
            Money::total(amounts),
            Err(StoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_money_display_keeps_cents() {
        assert_eq!(Money::new(dec!(45.00)).to_string(), "45.00");
        let subtotal = Price::new(dec!(2.50)).unwrap().times(2).unwrap();
        assert_eq!(subtotal.to_string(), "5.00");
    }

    #[test]
    fn test_price_deserialization_rejects_zero() {
        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
        let price: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(price.value(), dec!(12.50));
    }
}

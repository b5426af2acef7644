//! Registration fees as minor-unit amounts with an explicit currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies accepted for registration fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    INR,
    USD,
}

impl Currency {
    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A registration fee in the smallest unit of its currency (paise, cents)
/// to avoid floating-point precision issues.
///
/// Fees are strictly positive: a zero or negative amount never reaches the
/// payment gateway or the registration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new fee amount, rejecting non-positive values.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::NonPositiveFee);
        }
        Ok(Self { amount, currency })
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.amount / 100;
        let minor = (self.amount % 100).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_creation() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        assert_eq!(fee.amount(), 50000);
        assert_eq!(fee.currency(), Currency::INR);
    }

    #[test]
    fn test_zero_fee_fails() {
        let result = Money::new(0, Currency::INR);
        assert!(matches!(result, Err(DomainError::NonPositiveFee)));
    }

    #[test]
    fn test_negative_fee_fails() {
        let result = Money::new(-500, Currency::INR);
        assert!(matches!(result, Err(DomainError::NonPositiveFee)));
    }

    #[test]
    fn test_fee_display() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        assert_eq!(format!("{}", fee), "₹500.00");
    }
}

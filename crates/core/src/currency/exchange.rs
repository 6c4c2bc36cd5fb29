//! Exchange rate types and logic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency code.
    pub from_currency: String,
    /// Target currency code.
    pub to_currency: String,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub fn new(
        from_currency: impl Into<String>,
        to_currency: impl Into<String>,
        rate: Decimal,
    ) -> Self {
        Self {
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            rate,
        }
    }

    /// Returns the inverse rate, or `None` for a zero rate.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if self.rate.is_zero() {
            return None;
        }
        Some(Self {
            from_currency: self.to_currency.clone(),
            to_currency: self.from_currency.clone(),
            rate: Decimal::ONE.checked_div(self.rate)?,
        })
    }

    /// Composes `self` (A→B) with `next` (B→C) into A→C.
    #[must_use]
    pub fn then(&self, next: &Self) -> Option<Self> {
        if self.to_currency != next.from_currency {
            return None;
        }
        Some(Self {
            from_currency: self.from_currency.clone(),
            to_currency: next.to_currency.clone(),
            rate: self.rate.checked_mul(next.rate)?,
        })
    }
}

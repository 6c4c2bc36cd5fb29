//! In-memory rate table implementing [`CurrencyService`].
//!
//! Lookups try a direct rate, then the inverse of the reverse pair, then a
//! pivot through the table's base currency.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::conversion::convert_amount;
use super::exchange::ExchangeRate;
use super::service::{CurrencyError, CurrencyService};

/// A fixed snapshot of currency precisions and exchange rates.
#[derive(Debug, Clone)]
pub struct RateTable {
    base_currency: String,
    precisions: HashMap<String, u32>,
    rates: HashMap<(String, String), ExchangeRate>,
}

impl RateTable {
    /// Creates an empty table pivoting through `base_currency`.
    #[must_use]
    pub fn new(base_currency: impl Into<String>) -> Self {
        Self {
            base_currency: base_currency.into(),
            precisions: HashMap::new(),
            rates: HashMap::new(),
        }
    }

    /// Registers a currency and its precision.
    #[must_use]
    pub fn with_currency(mut self, code: impl Into<String>, precision: u32) -> Self {
        self.precisions.insert(code.into(), precision);
        self
    }

    /// Registers a rate: 1 `from` = `rate` `to`.
    #[must_use]
    pub fn with_rate(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        rate: Decimal,
    ) -> Self {
        let rate = ExchangeRate::new(from, to, rate);
        self.rates
            .insert((rate.from_currency.clone(), rate.to_currency.clone()), rate);
        self
    }

    /// A table with common currencies and no rates.
    #[must_use]
    pub fn with_common_currencies(base_currency: impl Into<String>) -> Self {
        Self::new(base_currency)
            .with_currency("USD", 2)
            .with_currency("EUR", 2)
            .with_currency("GBP", 2)
            .with_currency("IDR", 2)
            .with_currency("JPY", 0)
            .with_currency("KRW", 0)
            .with_currency("BHD", 3)
            .with_currency("KWD", 3)
    }

    /// Returns the base (pivot) currency.
    #[must_use]
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Finds a rate for the pair, trying direct, inverse, then pivot.
    #[must_use]
    pub fn find_rate(&self, from: &str, to: &str) -> Option<ExchangeRate> {
        if from == to {
            return Some(ExchangeRate::new(from, to, Decimal::ONE));
        }
        self.single_hop(from, to).or_else(|| {
            let base = self.base_currency.as_str();
            if from == base || to == base {
                return None;
            }
            let first = self.single_hop(from, base)?;
            let second = self.single_hop(base, to)?;
            first.then(&second)
        })
    }

    fn single_hop(&self, from: &str, to: &str) -> Option<ExchangeRate> {
        let key = |a: &str, b: &str| (a.to_string(), b.to_string());
        self.rates
            .get(&key(from, to))
            .cloned()
            .or_else(|| self.rates.get(&key(to, from)).and_then(ExchangeRate::inverse))
    }
}

#[async_trait]
impl CurrencyService for RateTable {
    async fn precision(&self, currency_code: &str) -> Result<u32, CurrencyError> {
        self.precisions
            .get(currency_code)
            .copied()
            .ok_or_else(|| CurrencyError::UnknownCurrency(currency_code.to_string()))
    }

    async fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Decimal, CurrencyError> {
        if from_currency == to_currency {
            return Ok(amount);
        }
        let rate = self
            .find_rate(from_currency, to_currency)
            .ok_or_else(|| CurrencyError::MissingRate {
                from: from_currency.to_string(),
                to: to_currency.to_string(),
            })?;
        convert_amount(amount, rate.rate).ok_or_else(|| CurrencyError::Overflow {
            amount,
            from: from_currency.to_string(),
            to: to_currency.to_string(),
        })
    }
}

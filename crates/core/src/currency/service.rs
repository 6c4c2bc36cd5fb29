//! Currency service interface.
//!
//! The ledger never hard-codes currency knowledge: precision and conversion
//! both come from an injected [`CurrencyService`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from currency lookups and conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    /// Currency code is not known to the service.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// No direct, inverse, or pivot rate connects the pair.
    #[error("No exchange rate available from {from} to {to}")]
    MissingRate {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// The converted amount does not fit in a decimal.
    #[error("Converting {amount} from {from} to {to} overflows")]
    Overflow {
        /// Amount being converted.
        amount: Decimal,
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// The rate source could not be reached.
    #[error("Currency service unavailable: {0}")]
    Unavailable(String),
}

impl CurrencyError {
    /// Returns a stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            Self::MissingRate { .. } => "NO_EXCHANGE_RATE",
            Self::Overflow { .. } => "CONVERSION_OVERFLOW",
            Self::Unavailable(_) => "CURRENCY_SERVICE_UNAVAILABLE",
        }
    }
}

/// Source of currency precision and conversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurrencyService: Send + Sync {
    /// Number of decimal digits for a currency (USD → 2, JPY → 0).
    async fn precision(&self, currency_code: &str) -> Result<u32, CurrencyError>;

    /// Converts an amount between currencies.
    ///
    /// The result is not rounded to the target precision; callers round at
    /// the edge. Same-currency conversion returns the amount unchanged.
    async fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Decimal, CurrencyError>;
}

/// Looks up a precision, using `fallback` for unknown currencies when set.
pub async fn precision_or_fallback(
    currency: &dyn CurrencyService,
    currency_code: &str,
    fallback: Option<u32>,
) -> Result<u32, CurrencyError> {
    match currency.precision(currency_code).await {
        Err(CurrencyError::UnknownCurrency(code)) => {
            fallback.ok_or(CurrencyError::UnknownCurrency(code))
        }
        other => other,
    }
}

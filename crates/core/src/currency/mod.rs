//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod exchange;
pub mod rates;
pub mod service;

pub use conversion::convert_amount;
pub use exchange::ExchangeRate;
pub use rates::RateTable;
pub use service::{CurrencyError, CurrencyService, precision_or_fallback};

#[cfg(test)]
pub use service::MockCurrencyService;

#[cfg(test)]
mod props;

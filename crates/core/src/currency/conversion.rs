//! Currency conversion arithmetic.
//!
//! Conversions keep [`INTERMEDIATE_SCALE`] digits with banker's rounding so
//! repeated pivots do not accumulate bias. The ledger applies half-up
//! rounding to the target currency's precision afterwards.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal digits kept on converted amounts before edge rounding.
pub const INTERMEDIATE_SCALE: u32 = 8;

/// Converts an amount using the given exchange rate.
///
/// Returns `None` when the product does not fit in a [`Decimal`].
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    let product = amount.checked_mul(rate)?;
    Some(product.round_dp_with_strategy(INTERMEDIATE_SCALE, RoundingStrategy::MidpointNearestEven))
}

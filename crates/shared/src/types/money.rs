//! Money precision primitives.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every addition or subtraction on a balance is followed by
//! [`round_to_precision`] ("edge rounding") so cached balances never drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds an amount to `precision` decimal digits, half-up.
///
/// Midpoints round away from zero: `2.345 -> 2.35`, `-2.345 -> -2.35`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use folio_shared::types::round_to_precision;
///
/// assert_eq!(round_to_precision(dec!(10.005), 2), dec!(10.01));
/// assert_eq!(round_to_precision(dec!(1234.5), 0), dec!(1235));
/// ```
#[must_use]
pub fn round_to_precision(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Tolerance for "effectively equal" amounts: `10^-(precision + 1)`.
#[must_use]
pub fn epsilon(precision: u32) -> Decimal {
    Decimal::new(1, precision.saturating_add(1).min(Decimal::MAX_SCALE))
}

/// Returns true when `|a - b| < epsilon(precision)`.
#[must_use]
pub fn amounts_are_equal(a: Decimal, b: Decimal, precision: u32) -> bool {
    a.checked_sub(b).is_some_and(|diff| diff.abs() < epsilon(precision))
}

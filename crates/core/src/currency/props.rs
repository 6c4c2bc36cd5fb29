//! Property-based tests for rate table conversions.

use folio_shared::types::amounts_are_equal;
use futures::executor::block_on;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::conversion::INTERMEDIATE_SCALE;
use super::rates::RateTable;
use super::service::CurrencyService;

/// Strategy to generate positive amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate rates between 0.01 and 100.
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (100i64..1_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

fn table(eur_usd: Decimal, gbp_usd: Decimal) -> RateTable {
    RateTable::with_common_currencies("USD")
        .with_rate("EUR", "USD", eur_usd)
        .with_rate("GBP", "USD", gbp_usd)
}

fn convert(table: &RateTable, amount: Decimal, from: &str, to: &str) -> Decimal {
    block_on(table.convert(amount, from, to)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converted amounts never carry more than the intermediate scale.
    #[test]
    fn prop_convert_keeps_intermediate_scale(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let result = convert(&table(rate, Decimal::ONE), amount, "EUR", "USD");
        prop_assert!(result.normalize().scale() <= INTERMEDIATE_SCALE);
        prop_assert!(result > Decimal::ZERO);
    }

    /// Same-currency conversion returns the amount untouched.
    #[test]
    fn prop_same_currency_is_identity(amount in positive_amount(), rate in positive_rate()) {
        let table = table(rate, rate);
        prop_assert_eq!(convert(&table, amount, "EUR", "EUR"), amount);
    }

    /// Converting there and back again lands within a cent.
    #[test]
    fn prop_inverse_round_trip(amount in positive_amount(), rate in positive_rate()) {
        let table = table(rate, Decimal::ONE);
        let usd = convert(&table, amount, "EUR", "USD");
        let back = convert(&table, usd, "USD", "EUR");
        prop_assert!(
            amounts_are_equal(back, amount, 2),
            "{} EUR came back as {}",
            amount,
            back
        );
    }

    /// A pivot through the base currency agrees with two explicit hops.
    #[test]
    fn prop_pivot_matches_two_hops(
        amount in positive_amount(),
        eur_usd in positive_rate(),
        gbp_usd in positive_rate(),
    ) {
        let table = table(eur_usd, gbp_usd);
        let pivot = convert(&table, amount, "EUR", "GBP");
        let hops = convert(&table, convert(&table, amount, "EUR", "USD"), "USD", "GBP");
        prop_assert!(
            amounts_are_equal(pivot, hops, 2),
            "pivot {} vs hops {}",
            pivot,
            hops
        );
    }
}

//! Property tests for the accounting rules.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::rules::{calculate_new_balance, impact_multiplier, validate_journal};
use super::types::{AccountType, TransactionType};

fn account_type_strategy() -> impl Strategy<Value = AccountType> {
    prop::sample::select(AccountType::ALL.to_vec())
}

fn side_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Debit), Just(TransactionType::Credit)]
}

/// Positive amounts with 2 decimal places.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Opposite sides always have opposite impact.
    #[test]
    fn prop_opposite_sides_have_opposite_impact(
        account_type in account_type_strategy(),
        side in side_strategy(),
    ) {
        prop_assert_eq!(
            impact_multiplier(account_type, side),
            -impact_multiplier(account_type, side.opposite())
        );
    }

    /// A line followed by its reversal restores the previous balance.
    #[test]
    fn prop_line_then_reversal_is_identity(
        previous in balance_strategy(),
        amount in amount_strategy(),
        account_type in account_type_strategy(),
        side in side_strategy(),
    ) {
        let after = calculate_new_balance(previous, amount, account_type, side, 2).unwrap();
        let restored =
            calculate_new_balance(after, amount, account_type, side.opposite(), 2).unwrap();
        prop_assert_eq!(restored, previous);
    }

    /// Mirrored debit/credit sets always balance with zero imbalance.
    #[test]
    fn prop_mirrored_lines_balance(amounts in prop::collection::vec(amount_strategy(), 1..10)) {
        let lines = amounts.iter().flat_map(|&amount| {
            [(TransactionType::Debit, amount), (TransactionType::Credit, amount)]
        });

        let validation = validate_journal(lines, 2).unwrap();

        prop_assert!(validation.is_valid);
        prop_assert_eq!(validation.imbalance, Decimal::ZERO);
        prop_assert_eq!(validation.total_debits, validation.total_credits);
    }

    /// Any nonzero difference at the journal precision is rejected.
    #[test]
    fn prop_off_by_one_unit_is_rejected(
        amount in amount_strategy(),
        extra_units in 1i64..1_000,
    ) {
        let off = amount + Decimal::new(extra_units, 2);
        let validation = validate_journal(
            [(TransactionType::Debit, off), (TransactionType::Credit, amount)],
            2,
        )
        .unwrap();

        prop_assert!(!validation.is_valid);
        prop_assert_eq!(validation.imbalance, Decimal::new(extra_units, 2));
    }
}

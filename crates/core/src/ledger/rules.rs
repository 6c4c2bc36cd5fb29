//! Accounting rules.
//!
//! Pure functions shared by the journal pipeline, the ground-truth
//! recomputation, and integrity checks. Every balance mutation goes through
//! [`calculate_new_balance`] so both paths round identically.
//!
//! - Asset/Expense: DEBIT → +1, CREDIT → −1
//! - Liability/Equity/Income: DEBIT → −1, CREDIT → +1

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{AccountType, JournalValidation, TransactionType};
use folio_shared::types::{amounts_are_equal, round_to_precision};

/// Returns the sign a line applies to its account's balance.
#[must_use]
pub fn impact_multiplier(account_type: AccountType, transaction_type: TransactionType) -> Decimal {
    match (account_type.is_debit_normal(), transaction_type) {
        (true, TransactionType::Debit) | (false, TransactionType::Credit) => Decimal::ONE,
        (true, TransactionType::Credit) | (false, TransactionType::Debit) => Decimal::NEGATIVE_ONE,
    }
}

/// Sums debit and credit lines (already in journal currency) and checks balance.
///
/// Totals are rounded after every addition. The journal is valid when
/// `|total_debits - total_credits| < epsilon(precision)`. Returns `None`
/// when a total overflows the decimal range.
#[must_use]
pub fn validate_journal(
    lines: impl IntoIterator<Item = (TransactionType, Decimal)>,
    precision: u32,
) -> Option<JournalValidation> {
    let mut total_debits = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;

    for (transaction_type, amount) in lines {
        let total = match transaction_type {
            TransactionType::Debit => &mut total_debits,
            TransactionType::Credit => &mut total_credits,
        };
        *total = round_to_precision(total.checked_add(amount)?, precision);
    }

    Some(JournalValidation {
        is_valid: amounts_are_equal(total_debits, total_credits, precision),
        total_debits,
        total_credits,
        imbalance: round_to_precision(total_debits.checked_sub(total_credits)?, precision),
    })
}

/// Returns true when a transaction dated `new_date` cannot be appended incrementally.
///
/// A date equal to the latest existing date counts as backdated: the
/// chronological tiebreak (creation time, then id) is not known until
/// the rows exist, so the account is rebuilt instead.
#[must_use]
pub fn is_backdated(new_date: DateTime<Utc>, latest_existing: Option<DateTime<Utc>>) -> bool {
    latest_existing.is_some_and(|latest| new_date <= latest)
}

/// Applies one line to a balance and rounds the result.
///
/// Returns `None` when the new balance overflows the decimal range.
#[must_use]
pub fn calculate_new_balance(
    previous: Decimal,
    amount: Decimal,
    account_type: AccountType,
    transaction_type: TransactionType,
    precision: u32,
) -> Option<Decimal> {
    let impact = amount.checked_mul(impact_multiplier(account_type, transaction_type))?;
    Some(round_to_precision(previous.checked_add(impact)?, precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AccountType::Asset, TransactionType::Debit, Decimal::ONE)]
    #[case(AccountType::Asset, TransactionType::Credit, Decimal::NEGATIVE_ONE)]
    #[case(AccountType::Expense, TransactionType::Debit, Decimal::ONE)]
    #[case(AccountType::Expense, TransactionType::Credit, Decimal::NEGATIVE_ONE)]
    #[case(AccountType::Liability, TransactionType::Debit, Decimal::NEGATIVE_ONE)]
    #[case(AccountType::Liability, TransactionType::Credit, Decimal::ONE)]
    #[case(AccountType::Equity, TransactionType::Debit, Decimal::NEGATIVE_ONE)]
    #[case(AccountType::Equity, TransactionType::Credit, Decimal::ONE)]
    #[case(AccountType::Income, TransactionType::Debit, Decimal::NEGATIVE_ONE)]
    #[case(AccountType::Income, TransactionType::Credit, Decimal::ONE)]
    fn test_impact_multiplier(
        #[case] account_type: AccountType,
        #[case] transaction_type: TransactionType,
        #[case] expected: Decimal,
    ) {
        assert_eq!(impact_multiplier(account_type, transaction_type), expected);
    }

    #[test]
    fn test_validate_balanced_journal() {
        let validation = validate_journal(
            [
                (TransactionType::Debit, dec!(60.00)),
                (TransactionType::Debit, dec!(40.00)),
                (TransactionType::Credit, dec!(100.00)),
            ],
            2,
        )
        .unwrap();
        assert!(validation.is_valid);
        assert_eq!(validation.total_debits, dec!(100.00));
        assert_eq!(validation.total_credits, dec!(100.00));
        assert_eq!(validation.imbalance, Decimal::ZERO);
    }

    #[test]
    fn test_validate_unbalanced_journal() {
        let validation = validate_journal(
            [
                (TransactionType::Debit, dec!(110.00)),
                (TransactionType::Credit, dec!(90.00)),
            ],
            2,
        )
        .unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.imbalance, dec!(20.00));
    }

    #[test]
    fn test_validate_rounds_each_addition() {
        // Sub-precision noise from conversions disappears with edge rounding.
        let validation = validate_journal(
            [
                (TransactionType::Debit, dec!(33.333)),
                (TransactionType::Debit, dec!(33.333)),
                (TransactionType::Debit, dec!(33.334)),
                (TransactionType::Credit, dec!(100.00)),
            ],
            2,
        )
        .unwrap();
        assert_eq!(validation.total_debits, dec!(100.00));
        assert!(validation.is_valid);
    }

    #[test]
    fn test_validate_zero_precision_currency() {
        let validation = validate_journal(
            [
                (TransactionType::Debit, dec!(15000)),
                (TransactionType::Credit, dec!(15000)),
            ],
            0,
        )
        .unwrap();
        assert!(validation.is_valid);
    }

    #[test]
    fn test_validate_total_overflow() {
        let validation = validate_journal(
            [
                (TransactionType::Debit, Decimal::MAX),
                (TransactionType::Debit, Decimal::MAX),
                (TransactionType::Credit, dec!(1)),
            ],
            0,
        );
        assert!(validation.is_none());
    }

    #[test]
    fn test_is_backdated() {
        let jan = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();

        assert!(!is_backdated(jan, None));
        assert!(!is_backdated(feb, Some(jan)));
        assert!(is_backdated(jan, Some(feb)));
        assert!(is_backdated(jan, Some(jan)));
    }

    #[test]
    fn test_calculate_new_balance() {
        use AccountType::{Asset, Liability};
        use TransactionType::{Credit, Debit};

        assert_eq!(
            calculate_new_balance(dec!(100.00), dec!(25.50), Asset, Credit, 2),
            Some(dec!(74.50))
        );
        assert_eq!(
            calculate_new_balance(dec!(0), dec!(500), Liability, Credit, 2),
            Some(dec!(500))
        );
        assert_eq!(
            calculate_new_balance(dec!(1.005), dec!(0.0001), Asset, Debit, 2),
            Some(dec!(1.01))
        );
    }

    #[test]
    fn test_calculate_new_balance_overflow() {
        use AccountType::{Asset, Income};
        use TransactionType::Debit;

        assert_eq!(calculate_new_balance(Decimal::MAX, dec!(1), Asset, Debit, 0), None);
        assert_eq!(calculate_new_balance(Decimal::MIN, dec!(1), Income, Debit, 0), None);
    }
}

//! Running balance arithmetic.
//!
//! Both the incremental path (appending new lines after the latest cached
//! balance) and the ground-truth path (replaying an account's whole ledger
//! from zero) fold [`calculate_new_balance`] over lines in chronological
//! order, so they agree whenever they see the same lines.

use folio_shared::types::TransactionId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{AccountType, Transaction, calculate_new_balance};

/// Running balance information for one ledger line.
///
/// - previous_balance: balance before this line
/// - current_balance: balance after this line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// The line.
    pub transaction_id: TransactionId,
    /// Balance before this line.
    pub previous_balance: Decimal,
    /// Balance after this line.
    pub current_balance: Decimal,
}

/// Result of replaying an account's ledger from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    /// Final balance.
    pub balance: Decimal,
    /// One entry per line, in ledger order.
    pub steps: Vec<RunningBalance>,
}

/// Replays lines (already in chronological order) from a zero balance.
///
/// Returns `None` if a running balance overflows the decimal range.
#[must_use]
pub fn replay(
    transactions: &[Transaction],
    account_type: AccountType,
    precision: u32,
) -> Option<Replay> {
    let mut balance = Decimal::ZERO;
    let mut steps = Vec::with_capacity(transactions.len());
    for tx in transactions {
        let previous = balance;
        balance = calculate_new_balance(
            previous,
            tx.amount,
            account_type,
            tx.transaction_type,
            precision,
        )?;
        steps.push(RunningBalance {
            transaction_id: tx.id,
            previous_balance: previous,
            current_balance: balance,
        });
    }

    Some(Replay { balance, steps })
}

/// Appends lines after `previous`, writing each line's running balance.
///
/// Returns the balance after the last line, or `None` on overflow.
pub fn append(
    previous: Decimal,
    lines: &mut [&mut Transaction],
    account_type: AccountType,
    precision: u32,
) -> Option<Decimal> {
    let mut balance = previous;
    for tx in lines.iter_mut() {
        balance = calculate_new_balance(
            balance,
            tx.amount,
            account_type,
            tx.transaction_type,
            precision,
        )?;
        tx.running_balance = balance;
    }
    Some(balance)
}

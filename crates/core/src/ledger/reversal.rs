//! Reversing and duplicating journal lines.
//!
//! A reversal swaps debits and credits line by line, keeping amounts and
//! the original exchange rates so the reversing journal nets the original
//! to exactly zero in every account.

use super::transaction::Transaction;
use super::types::JournalLineInput;

/// Memo prefix applied to every reversing line.
pub const REVERSAL_PREFIX: &str = "Reversal: ";

/// Builds the reversing lines for a journal's transactions.
///
/// For each original line:
/// - Debits become credits, credits become debits
/// - Amount and exchange rate are preserved
/// - Notes are prefixed with "Reversal: "
#[must_use]
pub fn reversing_lines(originals: &[Transaction]) -> Vec<JournalLineInput> {
    originals
        .iter()
        .map(|original| JournalLineInput {
            account_id: original.account_id,
            amount: original.amount,
            transaction_type: original.transaction_type.opposite(),
            notes: Some(format!(
                "{REVERSAL_PREFIX}{}",
                original.notes.as_deref().unwrap_or_default()
            )),
            exchange_rate: original.exchange_rate,
        })
        .collect()
}

/// Builds lines that re-submit a journal's transactions unchanged.
#[must_use]
pub fn duplicate_lines(originals: &[Transaction]) -> Vec<JournalLineInput> {
    originals
        .iter()
        .map(|original| JournalLineInput {
            account_id: original.account_id,
            amount: original.amount,
            transaction_type: original.transaction_type,
            notes: original.notes.clone(),
            exchange_rate: original.exchange_rate,
        })
        .collect()
}

/// Description for a reversing journal.
#[must_use]
pub fn reversal_description(original_description: Option<&str>, reason: &str) -> String {
    match original_description {
        Some(description) if !description.is_empty() => {
            format!("Reversal of {description}. Reason: {reason}")
        }
        _ => format!("Reversal. Reason: {reason}"),
    }
}

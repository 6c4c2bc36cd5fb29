//! Transaction (journal line) record and chronological ordering.

use chrono::{DateTime, Utc};
use folio_shared::types::{AccountId, JournalId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::TransactionType;

/// One line of a journal, affecting exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owning journal.
    pub journal_id: JournalId,
    /// Affected account.
    pub account_id: AccountId,
    /// Positive magnitude in the account's currency.
    pub amount: Decimal,
    /// Debit or credit.
    pub transaction_type: TransactionType,
    /// The account's currency.
    pub currency_code: String,
    /// Copy of the journal date.
    pub transaction_date: DateTime<Utc>,
    /// Optional memo.
    pub notes: Option<String>,
    /// Rate used to convert into the journal currency, if the currencies differ.
    pub exchange_rate: Option<Decimal>,
    /// Cached account balance after this line, in account currency.
    pub running_balance: Decimal,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
    /// When the line was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Sort key for an account's ledger: date, then creation time, then id.
pub type ChronologicalKey = (DateTime<Utc>, DateTime<Utc>, TransactionId);

impl Transaction {
    /// Returns the key that orders this line within its account's ledger.
    #[must_use]
    pub fn chronological_key(&self) -> ChronologicalKey {
        (self.transaction_date, self.created_at, self.id)
    }

    /// Returns true if the line has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Sorts lines into ledger order.
pub fn sort_chronologically(transactions: &mut [Transaction]) {
    transactions.sort_by_key(Transaction::chronological_key);
}

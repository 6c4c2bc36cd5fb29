//! Record store interface.
//!
//! The ledger talks to persistence only through [`RecordStore`]. Writes are
//! expressed as a [`WriteBatch`] that the store applies atomically: either
//! every operation lands or none does.
//!
//! Every read filters soft-deleted rows. Ledger reads additionally exclude
//! lines whose journal is deleted or still a draft.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::ledger::{Account, Journal, Transaction};
use folio_shared::types::{AccountId, JournalId, PageRequest, TransactionId};

pub use memory::MemoryStore;

/// Errors from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write referenced a record that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Record kind.
        entity: &'static str,
        /// Record id.
        id: String,
    },

    /// A stored row could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The backend failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// A single write operation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or replace an account.
    PutAccount(Account),
    /// Insert or replace a journal header.
    PutJournal(Journal),
    /// Insert or replace a transaction line.
    PutTransaction(Transaction),
    /// Overwrite a line's cached running balance.
    SetRunningBalance {
        /// The line to update.
        transaction_id: TransactionId,
        /// The new running balance.
        running_balance: Decimal,
        /// Update timestamp.
        updated_at: DateTime<Utc>,
    },
    /// Soft-delete a journal and every line it owns.
    SoftDeleteJournal {
        /// The journal to delete.
        journal_id: JournalId,
        /// Tombstone timestamp.
        deleted_at: DateTime<Utc>,
    },
    /// Soft-delete the current lines of a journal, keeping the header.
    SoftDeleteTransactions {
        /// The journal whose lines are replaced.
        journal_id: JournalId,
        /// Tombstone timestamp.
        deleted_at: DateTime<Utc>,
    },
    /// Append an audit row.
    AppendAudit(AuditLog),
}

/// An ordered set of writes applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Appends an operation, builder style.
    #[must_use]
    pub fn with(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Returns the operations in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch.
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Extend<WriteOp> for WriteBatch {
    fn extend<T: IntoIterator<Item = WriteOp>>(&mut self, iter: T) {
        self.ops.extend(iter);
    }
}

impl FromIterator<WriteOp> for WriteBatch {
    fn from_iter<T: IntoIterator<Item = WriteOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Row counts removed by [`RecordStore::purge_deleted`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Journals removed.
    pub journals: u64,
    /// Transaction lines removed.
    pub transactions: u64,
    /// Accounts removed.
    pub accounts: u64,
}

impl PurgeSummary {
    /// Total rows removed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.journals + self.transactions + self.accounts
    }
}

/// Persistence seam for accounts, journals, transactions, and audit rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Finds a non-deleted account.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Finds the non-deleted accounts among `ids`.
    async fn find_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError>;

    /// Lists all non-deleted accounts.
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Finds a non-deleted journal.
    async fn find_journal(&self, id: JournalId) -> Result<Option<Journal>, StoreError>;

    /// Lists a journal's non-deleted lines in creation order.
    async fn journal_transactions(&self, id: JournalId) -> Result<Vec<Transaction>, StoreError>;

    /// Lists an account's balance-affecting lines in chronological order.
    async fn ledger_transactions(&self, account_id: AccountId)
    -> Result<Vec<Transaction>, StoreError>;

    /// Returns the chronologically last balance-affecting line of an account.
    async fn latest_ledger_transaction(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Pages through an account's non-deleted lines (drafts included), newest first.
    ///
    /// Returns the page and the total row count.
    async fn account_transactions_page(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, u64), StoreError>;

    /// Applies a batch atomically.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Returns the audit rows for an entity, oldest first.
    async fn audit_trail(&self, entity_id: Uuid) -> Result<Vec<AuditLog>, StoreError>;

    /// Hard-deletes soft-deleted rows.
    async fn purge_deleted(&self) -> Result<PurgeSummary, StoreError>;

    /// Wipes every table.
    async fn reset(&self) -> Result<(), StoreError>;
}

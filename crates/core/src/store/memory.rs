//! In-memory [`RecordStore`].
//!
//! Batches are applied to a copy of the tables and swapped in only when
//! every operation succeeded, which gives the same all-or-nothing behaviour
//! as a database transaction.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PurgeSummary, RecordStore, StoreError, WriteBatch, WriteOp};
use crate::audit::AuditLog;
use crate::ledger::{Account, Journal, Transaction, sort_chronologically};
use folio_shared::types::{AccountId, JournalId, PageRequest, TransactionId};

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    journals: HashMap<JournalId, Journal>,
    transactions: HashMap<TransactionId, Transaction>,
    audit_logs: Vec<AuditLog>,
}

impl Tables {
    fn live_journal(&self, id: JournalId) -> Option<&Journal> {
        self.journals.get(&id).filter(|journal| !journal.is_deleted())
    }

    /// Non-deleted lines of an account whose journal is live.
    fn account_lines(&self, account_id: AccountId) -> impl Iterator<Item = &Transaction> {
        self.transactions.values().filter(move |tx| {
            tx.account_id == account_id
                && !tx.is_deleted()
                && self.live_journal(tx.journal_id).is_some()
        })
    }

    fn ledger_lines(&self, account_id: AccountId) -> Vec<Transaction> {
        let mut lines: Vec<Transaction> = self
            .account_lines(account_id)
            .filter(|tx| {
                self.live_journal(tx.journal_id)
                    .is_some_and(Journal::affects_balances)
            })
            .cloned()
            .collect();
        sort_chronologically(&mut lines);
        lines
    }

    fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::PutAccount(account) => {
                self.accounts.insert(account.id, account);
            }
            WriteOp::PutJournal(journal) => {
                self.journals.insert(journal.id, journal);
            }
            WriteOp::PutTransaction(transaction) => {
                if !self.journals.contains_key(&transaction.journal_id) {
                    return Err(StoreError::NotFound {
                        entity: "journal",
                        id: transaction.journal_id.to_string(),
                    });
                }
                self.transactions.insert(transaction.id, transaction);
            }
            WriteOp::SetRunningBalance {
                transaction_id,
                running_balance,
                updated_at,
            } => {
                let tx = self
                    .transactions
                    .get_mut(&transaction_id)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "transaction",
                        id: transaction_id.to_string(),
                    })?;
                tx.running_balance = running_balance;
                tx.updated_at = updated_at;
            }
            WriteOp::SoftDeleteJournal {
                journal_id,
                deleted_at,
            } => {
                let journal = self
                    .journals
                    .get_mut(&journal_id)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "journal",
                        id: journal_id.to_string(),
                    })?;
                if journal.deleted_at.is_none() {
                    journal.deleted_at = Some(deleted_at);
                }
                self.soft_delete_lines(journal_id, deleted_at);
            }
            WriteOp::SoftDeleteTransactions {
                journal_id,
                deleted_at,
            } => {
                self.soft_delete_lines(journal_id, deleted_at);
            }
            WriteOp::AppendAudit(log) => {
                self.audit_logs.push(log);
            }
        }
        Ok(())
    }

    fn soft_delete_lines(&mut self, journal_id: JournalId, deleted_at: DateTime<Utc>) {
        for tx in self
            .transactions
            .values_mut()
            .filter(|tx| tx.journal_id == journal_id && !tx.is_deleted())
        {
            tx.deleted_at = Some(deleted_at);
        }
    }
}

/// A [`RecordStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(&id).filter(|a| !a.is_deleted()).cloned())
    }

    async fn find_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        let tables = self.tables.read().await;
        let wanted: HashSet<&AccountId> = ids.iter().collect();
        Ok(tables
            .accounts
            .values()
            .filter(|a| wanted.contains(&a.id) && !a.is_deleted())
            .cloned()
            .collect())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| !a.is_deleted())
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }

    async fn find_journal(&self, id: JournalId) -> Result<Option<Journal>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.live_journal(id).cloned())
    }

    async fn journal_transactions(&self, id: JournalId) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.tables.read().await;
        let mut lines: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|tx| tx.journal_id == id && !tx.is_deleted())
            .cloned()
            .collect();
        lines.sort_by_key(|tx| (tx.created_at, tx.id));
        Ok(lines)
    }

    async fn ledger_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.ledger_lines(account_id))
    }

    async fn latest_ledger_transaction(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Transaction>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.ledger_lines(account_id).pop())
    }

    async fn account_transactions_page(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, u64), StoreError> {
        let tables = self.tables.read().await;
        let mut lines: Vec<Transaction> = tables.account_lines(account_id).cloned().collect();
        sort_chronologically(&mut lines);
        lines.reverse();

        let total = lines.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let data = lines.into_iter().skip(offset).take(limit).collect();
        Ok((data, total))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        for op in batch.into_ops() {
            staged.apply(op)?;
        }
        *tables = staged;
        Ok(())
    }

    async fn audit_trail(&self, entity_id: Uuid) -> Result<Vec<AuditLog>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit_logs
            .iter()
            .filter(|log| log.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn purge_deleted(&self) -> Result<PurgeSummary, StoreError> {
        let mut tables = self.tables.write().await;
        let mut summary = PurgeSummary::default();

        let dead_journals: HashSet<JournalId> = tables
            .journals
            .values()
            .filter(|j| j.is_deleted())
            .map(|j| j.id)
            .collect();

        let before = tables.transactions.len();
        tables
            .transactions
            .retain(|_, tx| !tx.is_deleted() && !dead_journals.contains(&tx.journal_id));
        summary.transactions = (before - tables.transactions.len()) as u64;

        tables.journals.retain(|id, _| !dead_journals.contains(id));
        summary.journals = dead_journals.len() as u64;

        let before = tables.accounts.len();
        tables.accounts.retain(|_, a| !a.is_deleted());
        summary.accounts = (before - tables.accounts.len()) as u64;

        Ok(summary)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}

//! `SeaORM`-backed [`RecordStore`].

mod mapping;

use async_trait::async_trait;
use folio_core::audit::AuditLog;
use folio_core::ledger::{Account, Journal, JournalStatus, Transaction};
use folio_core::store::{PurgeSummary, RecordStore, StoreError, WriteBatch, WriteOp};
use folio_shared::types::{AccountId, JournalId, PageRequest};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};
use sea_orm::sea_query::{Expr, OnConflict};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::{accounts, audit_logs, journals, ledger_transactions};

fn backend(e: DbErr) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Record store over a `SeaORM` connection (SQLite or Postgres).
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Non-deleted lines of an account whose journal is live.
    fn account_lines(account_id: AccountId) -> Select<ledger_transactions::Entity> {
        ledger_transactions::Entity::find()
            .inner_join(journals::Entity)
            .filter(ledger_transactions::Column::AccountId.eq(account_id.into_inner()))
            .filter(ledger_transactions::Column::DeletedAt.is_null())
            .filter(journals::Column::DeletedAt.is_null())
    }

    /// Lines that count toward the account's balance.
    fn ledger_lines(account_id: AccountId) -> Select<ledger_transactions::Entity> {
        Self::account_lines(account_id)
            .filter(journals::Column::Status.ne(JournalStatus::Draft.as_str()))
    }

    async fn apply_op(txn: &DatabaseTransaction, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::PutAccount(account) => {
                accounts::Entity::insert(accounts::ActiveModel::from(&account))
                    .on_conflict(
                        OnConflict::column(accounts::Column::Id)
                            .update_columns([
                                accounts::Column::Name,
                                accounts::Column::AccountType,
                                accounts::Column::CurrencyCode,
                                accounts::Column::ParentAccountId,
                                accounts::Column::Description,
                                accounts::Column::UpdatedAt,
                                accounts::Column::DeletedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await
                    .map_err(backend)?;
            }
            WriteOp::PutJournal(journal) => {
                journals::Entity::insert(journals::ActiveModel::from(&journal))
                    .on_conflict(
                        OnConflict::column(journals::Column::Id)
                            .update_columns([
                                journals::Column::JournalDate,
                                journals::Column::Description,
                                journals::Column::CurrencyCode,
                                journals::Column::Status,
                                journals::Column::TotalAmount,
                                journals::Column::TransactionCount,
                                journals::Column::DisplayType,
                                journals::Column::ReversingJournalId,
                                journals::Column::UpdatedAt,
                                journals::Column::DeletedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await
                    .map_err(backend)?;
            }
            WriteOp::PutTransaction(transaction) => {
                let journal_id = transaction.journal_id.into_inner();
                let journal_exists = journals::Entity::find_by_id(journal_id)
                    .count(txn)
                    .await
                    .map_err(backend)?
                    > 0;
                if !journal_exists {
                    return Err(StoreError::NotFound {
                        entity: "journal",
                        id: transaction.journal_id.to_string(),
                    });
                }

                ledger_transactions::Entity::insert(ledger_transactions::ActiveModel::from(
                    &transaction,
                ))
                .on_conflict(
                    OnConflict::column(ledger_transactions::Column::Id)
                        .update_columns([
                            ledger_transactions::Column::Amount,
                            ledger_transactions::Column::TransactionType,
                            ledger_transactions::Column::TransactionDate,
                            ledger_transactions::Column::Notes,
                            ledger_transactions::Column::ExchangeRate,
                            ledger_transactions::Column::RunningBalance,
                            ledger_transactions::Column::UpdatedAt,
                            ledger_transactions::Column::DeletedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(txn)
                .await
                .map_err(backend)?;
            }
            WriteOp::SetRunningBalance {
                transaction_id,
                running_balance,
                updated_at,
            } => {
                let result = ledger_transactions::Entity::update_many()
                    .col_expr(
                        ledger_transactions::Column::RunningBalance,
                        Expr::value(running_balance.to_string()),
                    )
                    .col_expr(ledger_transactions::Column::UpdatedAt, Expr::value(updated_at))
                    .filter(ledger_transactions::Column::Id.eq(transaction_id.into_inner()))
                    .exec(txn)
                    .await
                    .map_err(backend)?;
                if result.rows_affected == 0 {
                    return Err(StoreError::NotFound {
                        entity: "transaction",
                        id: transaction_id.to_string(),
                    });
                }
            }
            WriteOp::SoftDeleteJournal {
                journal_id,
                deleted_at,
            } => {
                let result = journals::Entity::update_many()
                    .col_expr(journals::Column::DeletedAt, Expr::value(deleted_at))
                    .col_expr(journals::Column::UpdatedAt, Expr::value(deleted_at))
                    .filter(journals::Column::Id.eq(journal_id.into_inner()))
                    .exec(txn)
                    .await
                    .map_err(backend)?;
                if result.rows_affected == 0 {
                    return Err(StoreError::NotFound {
                        entity: "journal",
                        id: journal_id.to_string(),
                    });
                }
                Self::soft_delete_lines(txn, journal_id, deleted_at).await?;
            }
            WriteOp::SoftDeleteTransactions {
                journal_id,
                deleted_at,
            } => {
                Self::soft_delete_lines(txn, journal_id, deleted_at).await?;
            }
            WriteOp::AppendAudit(log) => {
                audit_logs::Entity::insert(audit_logs::ActiveModel::from(&log))
                    .exec_without_returning(txn)
                    .await
                    .map_err(backend)?;
            }
        }
        Ok(())
    }

    async fn soft_delete_lines(
        txn: &DatabaseTransaction,
        journal_id: JournalId,
        deleted_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), StoreError> {
        ledger_transactions::Entity::update_many()
            .col_expr(ledger_transactions::Column::DeletedAt, Expr::value(deleted_at))
            .col_expr(ledger_transactions::Column::UpdatedAt, Expr::value(deleted_at))
            .filter(ledger_transactions::Column::JournalId.eq(journal_id.into_inner()))
            .filter(ledger_transactions::Column::DeletedAt.is_null())
            .exec(txn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SeaOrmStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(accounts::Model::into_record)
            .transpose()
    }

    async fn find_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .filter(accounts::Column::DeletedAt.is_null())
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(accounts::Model::into_record)
            .collect()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        accounts::Entity::find()
            .filter(accounts::Column::DeletedAt.is_null())
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(accounts::Model::into_record)
            .collect()
    }

    async fn find_journal(&self, id: JournalId) -> Result<Option<Journal>, StoreError> {
        journals::Entity::find_by_id(id.into_inner())
            .filter(journals::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(journals::Model::into_record)
            .transpose()
    }

    async fn journal_transactions(&self, id: JournalId) -> Result<Vec<Transaction>, StoreError> {
        ledger_transactions::Entity::find()
            .filter(ledger_transactions::Column::JournalId.eq(id.into_inner()))
            .filter(ledger_transactions::Column::DeletedAt.is_null())
            .order_by_asc(ledger_transactions::Column::CreatedAt)
            .order_by_asc(ledger_transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(ledger_transactions::Model::into_record)
            .collect()
    }

    async fn ledger_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        Self::ledger_lines(account_id)
            .order_by_asc(ledger_transactions::Column::TransactionDate)
            .order_by_asc(ledger_transactions::Column::CreatedAt)
            .order_by_asc(ledger_transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(ledger_transactions::Model::into_record)
            .collect()
    }

    async fn latest_ledger_transaction(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Transaction>, StoreError> {
        Self::ledger_lines(account_id)
            .order_by_desc(ledger_transactions::Column::TransactionDate)
            .order_by_desc(ledger_transactions::Column::CreatedAt)
            .order_by_desc(ledger_transactions::Column::Id)
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(ledger_transactions::Model::into_record)
            .transpose()
    }

    async fn account_transactions_page(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<(Vec<Transaction>, u64), StoreError> {
        let total = Self::account_lines(account_id)
            .count(&self.db)
            .await
            .map_err(backend)?;

        let lines = Self::account_lines(account_id)
            .order_by_desc(ledger_transactions::Column::TransactionDate)
            .order_by_desc(ledger_transactions::Column::CreatedAt)
            .order_by_desc(ledger_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(ledger_transactions::Model::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((lines, total))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.len();
        let txn = self.db.begin().await.map_err(backend)?;
        for op in batch.into_ops() {
            // Dropping `txn` on error rolls the batch back.
            Self::apply_op(&txn, op).await?;
        }
        txn.commit().await.map_err(backend)?;
        debug!(ops, "Write batch committed");
        Ok(())
    }

    async fn audit_trail(&self, entity_id: Uuid) -> Result<Vec<AuditLog>, StoreError> {
        audit_logs::Entity::find()
            .filter(audit_logs::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_logs::Column::Timestamp)
            .order_by_asc(audit_logs::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(audit_logs::Model::into_record)
            .collect()
    }

    async fn purge_deleted(&self) -> Result<PurgeSummary, StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;

        let dead_journals: Vec<Uuid> = journals::Entity::find()
            .select_only()
            .column(journals::Column::Id)
            .filter(journals::Column::DeletedAt.is_not_null())
            .into_tuple()
            .all(&txn)
            .await
            .map_err(backend)?;

        let transactions = ledger_transactions::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(ledger_transactions::Column::DeletedAt.is_not_null())
                    .add(ledger_transactions::Column::JournalId.is_in(dead_journals)),
            )
            .exec(&txn)
            .await
            .map_err(backend)?
            .rows_affected;
        let journals = journals::Entity::delete_many()
            .filter(journals::Column::DeletedAt.is_not_null())
            .exec(&txn)
            .await
            .map_err(backend)?
            .rows_affected;
        let accounts = accounts::Entity::delete_many()
            .filter(accounts::Column::DeletedAt.is_not_null())
            .exec(&txn)
            .await
            .map_err(backend)?
            .rows_affected;

        txn.commit().await.map_err(backend)?;
        info!(journals, transactions, accounts, "Purged soft-deleted rows");
        Ok(PurgeSummary {
            journals,
            transactions,
            accounts,
        })
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;
        audit_logs::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(backend)?;
        ledger_transactions::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(backend)?;
        journals::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(backend)?;
        accounts::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(backend)?;
        txn.commit().await.map_err(backend)?;
        warn!("All ledger tables wiped");
        Ok(())
    }
}

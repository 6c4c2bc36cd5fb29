//! Chart of accounts maintenance.

use std::sync::Arc;

use folio_shared::types::AccountId;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::balance::BalanceService;
use crate::balance::hierarchy::{AccountNode, depths};
use crate::ledger::{Account, LedgerError};
use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::time::Clock;

/// Opens, moves, and closes accounts while keeping the hierarchy acyclic.
pub struct AccountRegistry {
    store: Arc<dyn RecordStore>,
    balances: Arc<BalanceService>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AccountRegistry {
    /// Creates a registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        balances: Arc<BalanceService>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            balances,
            audit,
            clock,
        }
    }

    /// Stores a new account.
    ///
    /// The currency must be known and the parent, if any, must exist.
    pub async fn open_account(&self, account: Account) -> Result<Account, LedgerError> {
        self.balances.precision(&account.currency_code).await?;
        if let Some(parent) = account.parent_account_id {
            self.live_account(parent).await?;
        }

        self.store
            .apply(WriteBatch::new().with(WriteOp::PutAccount(account.clone())))
            .await?;

        info!(
            account_id = %account.id,
            account_type = account.account_type.as_str(),
            "Account opened"
        );
        self.audit
            .record(AuditEntry::account(
                account.id.into_inner(),
                AuditAction::Create,
                json!({ "after": account }),
            ))
            .await;
        Ok(account)
    }

    /// Moves an account under a new parent, or to the root with `None`.
    pub async fn move_account(
        &self,
        account_id: AccountId,
        parent: Option<AccountId>,
    ) -> Result<Account, LedgerError> {
        let before = self.live_account(account_id).await?;
        if let Some(parent) = parent {
            self.live_account(parent).await?;
        }

        let nodes: Vec<AccountNode> = self
            .store
            .list_accounts()
            .await?
            .into_iter()
            .map(|a| AccountNode {
                account_id: a.id,
                parent_id: if a.id == account_id { parent } else { a.parent_account_id },
                currency_code: a.currency_code,
                balance: Decimal::ZERO,
            })
            .collect();
        depths(&nodes)?;

        let mut account = before.clone();
        account.parent_account_id = parent;
        account.updated_at = self.clock.now();
        self.store
            .apply(WriteBatch::new().with(WriteOp::PutAccount(account.clone())))
            .await?;

        self.audit
            .record(AuditEntry::account(
                account_id.into_inner(),
                AuditAction::Update,
                json!({ "before": before, "after": account }),
            ))
            .await;
        Ok(account)
    }

    /// Soft-deletes an account. Its lines are left in place.
    ///
    /// Accounts with live children must have them moved or closed first.
    pub async fn close_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        let before = self.live_account(account_id).await?;
        let children = self
            .store
            .list_accounts()
            .await?
            .iter()
            .filter(|a| a.parent_account_id == Some(account_id))
            .count();
        if children > 0 {
            return Err(LedgerError::AccountHasChildren {
                account_id,
                children,
            });
        }

        let mut account = before.clone();
        let now = self.clock.now();
        account.deleted_at = Some(now);
        account.updated_at = now;

        self.store
            .apply(WriteBatch::new().with(WriteOp::PutAccount(account.clone())))
            .await?;

        info!(account_id = %account_id, "Account closed");
        self.audit
            .record(AuditEntry::account(
                account_id.into_inner(),
                AuditAction::Delete,
                json!({ "before": before }),
            ))
            .await;
        Ok(account)
    }

    async fn live_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }
}

//! Balance service: ground truth, rebuilds, and balance reads.

use std::sync::Arc;

use async_trait::async_trait;
use folio_shared::LedgerSettings;
use folio_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use super::hierarchy::{AccountNode, AggregatedBalance, RollupPolicy, aggregate};
use super::running::{Replay, RunningBalance, replay};
use crate::currency::{CurrencyService, precision_or_fallback};
use crate::ledger::{Account, LedgerError, Transaction, sort_chronologically};
use crate::scheduler::{AccountRebuilder, RebuildReport};
use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::time::Clock;

/// An account's ledger replayed from zero.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    /// The account.
    pub account: Account,
    /// The account currency's precision.
    pub precision: u32,
    /// Balance-affecting lines in chronological order, with cached balances as stored.
    pub transactions: Vec<Transaction>,
    /// Recomputed running balances.
    pub replay: Replay,
}

impl GroundTruth {
    /// The recomputed balance.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.replay.balance
    }

    /// Lines whose stored running balance differs from the recomputed one.
    pub fn stale_lines(&self) -> impl Iterator<Item = (&Transaction, &RunningBalance)> {
        self.transactions
            .iter()
            .zip(&self.replay.steps)
            .filter(|(tx, step)| tx.running_balance != step.current_balance)
    }
}

/// An account's cached balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    /// The account.
    pub account_id: AccountId,
    /// The account's currency.
    pub currency_code: String,
    /// Running balance of the latest ledger line, or zero.
    pub balance: Decimal,
}

/// Reads and repairs account balances.
pub struct BalanceService {
    store: Arc<dyn RecordStore>,
    currency: Arc<dyn CurrencyService>,
    settings: LedgerSettings,
    clock: Arc<dyn Clock>,
}

impl BalanceService {
    /// Creates a balance service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        currency: Arc<dyn CurrencyService>,
        settings: LedgerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            currency,
            settings,
            clock,
        }
    }

    /// The currency service.
    #[must_use]
    pub fn currency(&self) -> &dyn CurrencyService {
        self.currency.as_ref()
    }

    /// Ledger settings.
    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Precision for a currency, honouring the configured fallback.
    pub async fn precision(&self, currency_code: &str) -> Result<u32, LedgerError> {
        Ok(precision_or_fallback(
            self.currency.as_ref(),
            currency_code,
            self.settings.fallback_precision,
        )
        .await?)
    }

    async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Replays the account's balance-affecting lines from zero.
    pub async fn ground_truth(&self, account_id: AccountId) -> Result<GroundTruth, LedgerError> {
        let account = self.account(account_id).await?;
        let precision = self.precision(&account.currency_code).await?;
        let mut transactions = self.store.ledger_transactions(account_id).await?;
        sort_chronologically(&mut transactions);
        let replay = replay(&transactions, account.account_type, precision)
            .ok_or(LedgerError::BalanceOverflow(account_id))?;

        Ok(GroundTruth {
            account,
            precision,
            transactions,
            replay,
        })
    }

    /// Cached balance: the latest ledger line's running balance, or zero.
    pub async fn cached_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .latest_ledger_transaction(account_id)
            .await?
            .map_or(Decimal::ZERO, |tx| tx.running_balance))
    }

    /// Cached balance of one account, with its currency.
    pub async fn account_balance(
        &self,
        account_id: AccountId,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self.account(account_id).await?;
        Ok(AccountBalance {
            account_id,
            currency_code: account.currency_code,
            balance: self.cached_balance(account_id).await?,
        })
    }

    /// Recomputes the account from zero and rewrites stale running balances.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn rebuild(&self, account_id: AccountId) -> Result<RebuildReport, LedgerError> {
        let truth = self.ground_truth(account_id).await?;
        let now = self.clock.now();

        let batch: WriteBatch = truth
            .stale_lines()
            .map(|(tx, step)| WriteOp::SetRunningBalance {
                transaction_id: tx.id,
                running_balance: step.current_balance,
                updated_at: now,
            })
            .collect();
        let transactions_updated = batch.len();

        if !batch.is_empty() {
            self.store.apply(batch).await?;
        }

        debug!(
            balance = %truth.balance(),
            checked = truth.transactions.len(),
            updated = transactions_updated,
            "Account rebuilt from ground truth"
        );

        Ok(RebuildReport {
            account_id,
            balance: truth.balance(),
            transactions_checked: truth.transactions.len(),
            transactions_updated,
        })
    }

    /// Aggregated balances for every account in the hierarchy.
    pub async fn balance_tree(&self) -> Result<Vec<AggregatedBalance>, LedgerError> {
        let accounts = self.store.list_accounts().await?;
        let mut nodes = Vec::with_capacity(accounts.len());
        for account in accounts {
            nodes.push(AccountNode {
                account_id: account.id,
                parent_id: account.parent_account_id,
                balance: self.cached_balance(account.id).await?,
                currency_code: account.currency_code,
            });
        }

        let policy = RollupPolicy {
            default_currency: self.settings.default_currency.clone(),
            mixed_target: self.settings.mixed_currency_target,
            fallback_precision: self.settings.fallback_precision,
        };
        aggregate(&nodes, &policy, self.currency.as_ref()).await
    }
}

#[async_trait]
impl AccountRebuilder for BalanceService {
    async fn rebuild_account(&self, account_id: AccountId) -> Result<RebuildReport, LedgerError> {
        self.rebuild(account_id).await
    }
}

//! Cached-vs-ground-truth verification and self-repair.

use std::sync::Arc;

use folio_shared::types::{AccountId, amounts_are_equal};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::balance::BalanceService;
use crate::ledger::LedgerError;
use crate::scheduler::RebuildScheduler;
use crate::store::{PurgeSummary, RecordStore};

/// Result of comparing one account's cache against its ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceCheck {
    /// The account.
    pub account_id: AccountId,
    /// The account's currency.
    pub currency_code: String,
    /// Running balance of the latest ledger line.
    pub cached_balance: Decimal,
    /// Balance replayed from zero.
    pub computed_balance: Decimal,
    /// `computed_balance - cached_balance`.
    pub discrepancy: Decimal,
    /// Lines whose stored running balance is wrong.
    pub mismatched_transactions: usize,
    /// True when the balances agree and no line is stale.
    pub matches: bool,
}

/// Summary of a startup integrity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StartupCheckSummary {
    /// Accounts verified.
    pub accounts_checked: usize,
    /// Accounts whose cache disagreed with ground truth.
    pub discrepancies_found: usize,
    /// Accounts sent for repair.
    pub repairs_attempted: usize,
    /// Repaired accounts that verified clean afterwards.
    pub repairs_successful: usize,
    /// Accounts that could not be verified at all.
    pub verification_errors: usize,
}

/// Verifies cached running balances and repairs them through the scheduler.
pub struct IntegrityVerifier {
    store: Arc<dyn RecordStore>,
    balances: Arc<BalanceService>,
    scheduler: RebuildScheduler,
}

impl IntegrityVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        balances: Arc<BalanceService>,
        scheduler: RebuildScheduler,
    ) -> Self {
        Self {
            store,
            balances,
            scheduler,
        }
    }

    /// Compares one account's cached balance with a full replay.
    pub async fn verify_account_balance(
        &self,
        account_id: AccountId,
    ) -> Result<BalanceCheck, LedgerError> {
        let truth = self.balances.ground_truth(account_id).await?;
        let cached_balance = self.balances.cached_balance(account_id).await?;
        let computed_balance = truth.balance();
        let mismatched_transactions = truth.stale_lines().count();

        Ok(BalanceCheck {
            account_id,
            currency_code: truth.account.currency_code.clone(),
            cached_balance,
            computed_balance,
            discrepancy: computed_balance
                .checked_sub(cached_balance)
                .ok_or(LedgerError::BalanceOverflow(account_id))?,
            mismatched_transactions,
            matches: mismatched_transactions == 0
                && amounts_are_equal(cached_balance, computed_balance, truth.precision),
        })
    }

    /// Verifies every non-deleted account.
    pub async fn verify_all_account_balances(&self) -> Result<Vec<BalanceCheck>, LedgerError> {
        let accounts = self.store.list_accounts().await?;
        let mut checks = Vec::with_capacity(accounts.len());
        for account in accounts {
            checks.push(self.verify_account_balance(account.id).await?);
        }
        Ok(checks)
    }

    /// Verifies every account and repairs the ones that disagree.
    ///
    /// Never fails: problems are logged and counted in the summary.
    #[instrument(skip(self))]
    pub async fn run_startup_check(&self) -> StartupCheckSummary {
        let mut summary = StartupCheckSummary::default();

        let accounts = match self.store.list_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "Startup integrity check could not list accounts");
                return summary;
            }
        };

        let mut mismatched = Vec::new();
        for account in &accounts {
            match self.verify_account_balance(account.id).await {
                Ok(check) => {
                    summary.accounts_checked += 1;
                    if !check.matches {
                        warn!(
                            account_id = %check.account_id,
                            cached = %check.cached_balance,
                            computed = %check.computed_balance,
                            discrepancy = %check.discrepancy,
                            stale_lines = check.mismatched_transactions,
                            "Balance discrepancy detected"
                        );
                        mismatched.push(check.account_id);
                    }
                }
                Err(e) => {
                    summary.verification_errors += 1;
                    error!(account_id = %account.id, error = %e, "Account verification failed");
                }
            }
        }
        summary.discrepancies_found = mismatched.len();

        if !mismatched.is_empty() {
            summary.repairs_attempted = mismatched.len();
            self.scheduler.enqueue(mismatched.iter().copied());
            let outcome = self.scheduler.flush().await;
            for failure in &outcome.failed {
                error!(
                    account_id = %failure.account_id,
                    error = %failure.error,
                    "Balance repair failed"
                );
            }

            for &account_id in &mismatched {
                match self.verify_account_balance(account_id).await {
                    Ok(check) if check.matches => summary.repairs_successful += 1,
                    Ok(check) => warn!(
                        account_id = %account_id,
                        discrepancy = %check.discrepancy,
                        "Balance still inconsistent after repair"
                    ),
                    Err(e) => {
                        error!(account_id = %account_id, error = %e, "Repair verification failed");
                    }
                }
            }
        }

        info!(
            checked = summary.accounts_checked,
            discrepancies = summary.discrepancies_found,
            repaired = summary.repairs_successful,
            errors = summary.verification_errors,
            "Startup integrity check finished"
        );
        summary
    }

    /// Wipes every record and drops queued rebuilds.
    pub async fn reset_database(&self) -> Result<(), LedgerError> {
        self.scheduler.clear();
        self.store.reset().await?;
        warn!("Database reset");
        Ok(())
    }

    /// Permanently removes soft-deleted records.
    pub async fn cleanup_database(&self) -> Result<PurgeSummary, LedgerError> {
        let purged = self.store.purge_deleted().await?;
        info!(
            journals = purged.journals,
            transactions = purged.transactions,
            accounts = purged.accounts,
            "Soft-deleted records purged"
        );
        Ok(purged)
    }
}

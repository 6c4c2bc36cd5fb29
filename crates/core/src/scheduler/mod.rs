//! Debounced background rebuild scheduling.
//!
//! Accounts whose cached running balances may be stale are queued here and
//! rebuilt from ground truth after a quiet period, in bounded batches.

mod rebuild;


use async_trait::async_trait;
use folio_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

pub use rebuild::{RebuildScheduler, SchedulerStatus};

/// Where an account stands in the rebuild pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRebuildState {
    /// No rebuild pending.
    Clean,
    /// Waiting for the next batch.
    Queued,
    /// Being rebuilt right now.
    Processing,
}

/// Summary of one account's ground-truth rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// The rebuilt account.
    pub account_id: AccountId,
    /// Ground-truth balance after the rebuild.
    pub balance: Decimal,
    /// Lines replayed.
    pub transactions_checked: usize,
    /// Lines whose cached running balance was rewritten.
    pub transactions_updated: usize,
}

/// A rebuild that failed. Other accounts in the batch are unaffected.
#[derive(Debug)]
pub struct RebuildFailure {
    /// The account that could not be rebuilt.
    pub account_id: AccountId,
    /// Why.
    pub error: LedgerError,
}

/// Result of draining the rebuild queue.
#[derive(Debug, Default)]
pub struct RebuildOutcome {
    /// Successful rebuilds.
    pub rebuilt: Vec<RebuildReport>,
    /// Failed rebuilds.
    pub failed: Vec<RebuildFailure>,
}

impl RebuildOutcome {
    /// Returns true if no rebuild failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total accounts attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.rebuilt.len() + self.failed.len()
    }

    fn absorb(&mut self, other: Self) {
        self.rebuilt.extend(other.rebuilt);
        self.failed.extend(other.failed);
    }
}

/// Recomputes one account's running balances from ground truth.
#[async_trait]
pub trait AccountRebuilder: Send + Sync {
    /// Rebuilds the account, rewriting stale cached balances.
    async fn rebuild_account(&self, account_id: AccountId) -> Result<RebuildReport, LedgerError>;
}

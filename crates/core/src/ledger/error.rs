//! Ledger error types.
//!
//! Every foreground failure surfaces to the caller as a [`LedgerError`].
//! Background rebuild failures are collected per account and never
//! propagate (see [`crate::scheduler::RebuildFailure`]).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::currency::CurrencyError;
use crate::store::StoreError;
use folio_shared::types::{AccountId, JournalId};

/// Broad classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is invalid. Nothing was written.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// Conversion between currencies failed.
    Currency,
    /// The record store failed. The operation may be retried.
    Persistence,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Journal must have at least 2 lines.
    #[error("Journal must have at least 2 lines")]
    InsufficientLines,

    /// Line amount must be positive after rounding to the account precision,
    /// and must convert into the journal currency without overflowing.
    #[error("Invalid amount {amount} for account {account_id}")]
    InvalidAmount {
        /// The account the line posts to.
        account_id: AccountId,
        /// The offending amount.
        amount: Decimal,
    },

    /// A pinned exchange rate must be positive.
    #[error("Invalid exchange rate {rate} for account {account_id}: rates must be positive")]
    InvalidExchangeRate {
        /// The account the line posts to.
        account_id: AccountId,
        /// The offending rate.
        rate: Decimal,
    },

    /// Journal totals do not fit in a decimal.
    #[error("Journal totals exceed the supported amount range")]
    TotalsOverflow,

    /// A running balance does not fit in a decimal.
    #[error("Running balance of account {0} exceeds the supported amount range")]
    BalanceOverflow(AccountId),

    /// Journal does not balance in journal currency.
    #[error(
        "Journal is not balanced. Debits: {total_debits}, Credits: {total_credits}, Imbalance: {imbalance}"
    )]
    UnbalancedJournal {
        /// Total debits in journal currency.
        total_debits: Decimal,
        /// Total credits in journal currency.
        total_credits: Decimal,
        /// `total_debits - total_credits`.
        imbalance: Decimal,
    },

    /// Account hierarchy contains a cycle through this account.
    #[error("Account hierarchy contains a cycle at account {0}")]
    AccountCycle(AccountId),

    /// Account still has live children.
    #[error("Account {account_id} still has {children} open child accounts")]
    AccountHasChildren {
        /// The account being closed.
        account_id: AccountId,
        /// Number of live children.
        children: usize,
    },

    // ========== Not Found Errors ==========
    /// Account not found (or soft-deleted).
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Journal not found (or soft-deleted).
    #[error("Journal not found: {0}")]
    JournalNotFound(JournalId),

    // ========== Journal State Errors ==========
    /// Journal has already been reversed.
    #[error("Journal {0} has already been reversed")]
    JournalAlreadyReversed(JournalId),

    /// Draft journals cannot be reversed.
    #[error("Cannot reverse draft journal {0}")]
    CannotReverseDraft(JournalId),

    // ========== Collaborator Errors ==========
    /// Currency lookup or conversion failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Record store failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl LedgerError {
    /// Returns the broad classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientLines
            | Self::InvalidAmount { .. }
            | Self::InvalidExchangeRate { .. }
            | Self::TotalsOverflow
            | Self::BalanceOverflow(_)
            | Self::UnbalancedJournal { .. }
            | Self::AccountCycle(_)
            | Self::AccountHasChildren { .. }
            | Self::JournalAlreadyReversed(_)
            | Self::CannotReverseDraft(_)
            | Self::Currency(
                CurrencyError::UnknownCurrency(_) | CurrencyError::Overflow { .. },
            ) => ErrorKind::Validation,

            Self::AccountNotFound(_) | Self::JournalNotFound(_) => ErrorKind::NotFound,

            Self::Currency(_) => ErrorKind::Currency,

            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Returns a stable error code for callers and logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidExchangeRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::TotalsOverflow => "TOTALS_OVERFLOW",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::UnbalancedJournal { .. } => "UNBALANCED_JOURNAL",
            Self::AccountCycle(_) => "ACCOUNT_CYCLE",
            Self::AccountHasChildren { .. } => "ACCOUNT_HAS_CHILDREN",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::JournalNotFound(_) => "JOURNAL_NOT_FOUND",
            Self::JournalAlreadyReversed(_) => "JOURNAL_ALREADY_REVERSED",
            Self::CannotReverseDraft(_) => "CANNOT_REVERSE_DRAFT",
            Self::Currency(err) => err.error_code(),
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Currency(CurrencyError::Unavailable(_))
        )
    }
}

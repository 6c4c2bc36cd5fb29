//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Account, journal, and transaction records
//! - Accounting rules (impact multipliers, balancing, backdating)
//! - Domain types for journal creation
//! - Reversal and duplication of journal lines
//! - Error types for ledger operations

pub mod account;
pub mod error;
pub mod journal;
pub mod reversal;
pub mod rules;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod rules_props;

pub use account::Account;
pub use error::{ErrorKind, LedgerError};
pub use journal::Journal;
pub use rules::{calculate_new_balance, impact_multiplier, is_backdated, validate_journal};
pub use transaction::{ChronologicalKey, Transaction, sort_chronologically};
pub use types::{
    AccountType, DisplayType, JournalInput, JournalLineInput, JournalStatus, JournalValidation,
    TransactionType,
};

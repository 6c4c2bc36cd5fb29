//! Core ledger consistency engine for Folio.
//!
//! This crate holds the accounting rules and every piece of balance
//! bookkeeping. It has no database dependency: persistence, currency rates,
//! audit output and time all come in through traits.
//!
//! # Modules
//!
//! - `ledger` - Records, accounting rules, and ledger errors
//! - `currency` - Currency precision and conversion
//! - `balance` - Running balances, ground truth, and hierarchy aggregation
//! - `scheduler` - Debounced, batched background rebuilds
//! - `integrity` - Cache verification, repair, and maintenance
//! - `journal` - The journal write path and read projections
//! - `accounts` - Chart of accounts maintenance
//! - `engine` - Wires the services together

pub mod accounts;
pub mod audit;
pub mod balance;
pub mod currency;
pub mod engine;
pub mod integrity;
pub mod journal;
pub mod ledger;
pub mod scheduler;
pub mod store;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{LedgerEngine, LedgerEngineBuilder};

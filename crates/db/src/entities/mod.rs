//! `SeaORM` entities for the ledger tables.
//!
//! Decimal columns are stored as text so SQLite keeps them exact.

pub mod accounts;
pub mod audit_logs;
pub mod journals;
pub mod ledger_transactions;

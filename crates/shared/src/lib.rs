//! Shared types and configuration for Folio.
//!
//! This crate provides common types used across all other crates:
//! - Money precision primitives (rounding, epsilon equality)
//! - Typed IDs for type-safe entity references
//! - Pagination types for read projections
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{
    AppConfig, DatabaseConfig, IntegritySettings, LedgerSettings, MixedCurrencyTarget,
    RebuildSettings,
};

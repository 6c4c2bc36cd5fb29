//! Integrity verification and disaster-recovery maintenance.

pub mod verifier;

#[cfg(test)]
mod tests;

pub use verifier::{BalanceCheck, IntegrityVerifier, StartupCheckSummary};

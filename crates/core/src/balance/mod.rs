//! Account balances.
//!
//! - `running` - running balance arithmetic shared by every path
//! - `hierarchy` - multi-currency aggregation up the account tree
//! - `service` - ground truth, rebuilds, and balance reads

pub mod hierarchy;
pub mod running;
pub mod service;

#[cfg(test)]
mod props;

pub use hierarchy::{AccountNode, AggregatedBalance, RollupPolicy, aggregate};
pub use running::{Replay, RunningBalance, replay};
pub use service::{AccountBalance, BalanceService, GroundTruth};

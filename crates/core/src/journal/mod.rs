//! Journal write path and read projections.

pub mod projection;
pub mod service;


pub use projection::{EnrichedTransaction, JournalDetails};
pub use service::{JournalRecord, JournalService};

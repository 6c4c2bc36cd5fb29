//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{amounts_are_equal, epsilon, round_to_precision};
pub use pagination::{PageMeta, PageRequest, PageResponse};

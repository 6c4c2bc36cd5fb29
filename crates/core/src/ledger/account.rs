//! Account record.

use chrono::{DateTime, Utc};
use folio_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use super::types::AccountType;

/// A node in the chart of accounts.
///
/// The balance is not stored here: it is the running balance of the
/// account's latest non-deleted posted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Classification that drives the impact multiplier.
    pub account_type: AccountType,
    /// Currency the account is denominated in.
    pub currency_code: String,
    /// Parent in the account hierarchy.
    pub parent_account_id: Option<AccountId>,
    /// Optional description.
    pub description: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates a new root account.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        account_type: AccountType,
        currency_code: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type,
            currency_code: currency_code.into(),
            parent_account_id: None,
            description: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Places the account under a parent.
    #[must_use]
    pub fn with_parent(mut self, parent: AccountId) -> Self {
        self.parent_account_id = Some(parent);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if the account has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

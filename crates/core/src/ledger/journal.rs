//! Journal record.

use chrono::{DateTime, Utc};
use folio_shared::types::JournalId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DisplayType, JournalStatus};

/// A user-visible economic event: the header for a set of balanced lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Unique identifier.
    pub id: JournalId,
    /// Logical date of the event.
    pub journal_date: DateTime<Utc>,
    /// Optional description.
    pub description: Option<String>,
    /// Settlement/reporting currency.
    pub currency_code: String,
    /// Lifecycle status.
    pub status: JournalStatus,
    /// Cached total in journal currency.
    pub total_amount: Decimal,
    /// Cached number of lines.
    pub transaction_count: u32,
    /// Presentation-only classification.
    pub display_type: DisplayType,
    /// The journal that reverses this one, once reversed.
    pub reversing_journal_id: Option<JournalId>,
    /// When the journal was created.
    pub created_at: DateTime<Utc>,
    /// When the journal was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Journal {
    /// Returns true if the journal has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the journal's lines count towards balances.
    #[must_use]
    pub fn affects_balances(&self) -> bool {
        !self.is_deleted() && self.status.affects_balances()
    }

    /// Returns true if the journal can be reversed.
    #[must_use]
    pub fn can_reverse(&self) -> bool {
        self.status == JournalStatus::Posted
    }
}

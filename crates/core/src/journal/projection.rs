//! Read projections over journals and their lines.

use serde::Serialize;

use crate::ledger::{Account, AccountType, DisplayType, Journal, JournalStatus, Transaction};

/// A ledger line with its account and journal context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedTransaction {
    /// The line itself.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Name of the line's account, if it still exists.
    pub account_name: Option<String>,
    /// Type of the line's account, if it still exists.
    pub account_type: Option<AccountType>,
    /// Parent journal description.
    pub journal_description: Option<String>,
    /// Parent journal status.
    pub journal_status: JournalStatus,
    /// Parent journal currency.
    pub journal_currency_code: String,
    /// Parent journal classification.
    pub display_type: DisplayType,
}

impl EnrichedTransaction {
    pub(crate) fn new(
        transaction: Transaction,
        account: Option<&Account>,
        journal: &Journal,
    ) -> Self {
        Self {
            transaction,
            account_name: account.map(|a| a.name.clone()),
            account_type: account.map(|a| a.account_type),
            journal_description: journal.description.clone(),
            journal_status: journal.status,
            journal_currency_code: journal.currency_code.clone(),
            display_type: journal.display_type,
        }
    }
}

/// A journal with its enriched lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalDetails {
    /// The journal header.
    pub journal: Journal,
    /// Lines in insertion order.
    pub lines: Vec<EnrichedTransaction>,
}

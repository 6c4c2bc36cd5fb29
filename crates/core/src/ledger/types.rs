//! Ledger domain types for journal creation and validation.
//!
//! This module defines the closed set of enums that drive the accounting
//! rules, plus the input types callers use to submit journals.

use chrono::{DateTime, Utc};
use folio_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification.
///
/// - Asset/Expense accounts are debit-normal: debits increase the balance.
/// - Liability/Equity/Income accounts are credit-normal: credits increase the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Things the user owns (cash, bank accounts).
    Asset,
    /// Things the user owes (credit cards, loans).
    Liability,
    /// Opening balances and net worth adjustments.
    Equity,
    /// Salary, interest, refunds.
    Income,
    /// Spending categories.
    Expense,
}

impl AccountType {
    /// All account types, in chart-of-accounts order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Income,
        Self::Expense,
    ];

    /// Returns true if debits increase this account's balance.
    #[must_use]
    pub const fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// Side of a transaction line: debit or credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

impl TransactionType {
    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// Journal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    /// Saved but not yet affecting balances.
    Draft,
    /// Affects balances.
    Posted,
    /// Still affects balances, offset by its reversing journal.
    Reversed,
}

impl JournalStatus {
    /// Returns true if the journal's lines count towards account balances.
    #[must_use]
    pub const fn affects_balances(self) -> bool {
        !matches!(self, Self::Draft)
    }

    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }
}

impl std::str::FromStr for JournalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "posted" => Ok(Self::Posted),
            "reversed" => Ok(Self::Reversed),
            _ => Err(format!("Unknown journal status: {s}")),
        }
    }
}

/// Presentation-only classification of a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    /// Touches at least one expense account.
    Expense,
    /// Touches an income account and no expense account.
    Income,
    /// Moves value between balance-sheet accounts.
    Transfer,
}

impl DisplayType {
    /// Classifies a journal from the types of the accounts it touches.
    #[must_use]
    pub fn classify(account_types: impl IntoIterator<Item = AccountType>) -> Self {
        let mut has_income = false;
        for account_type in account_types {
            match account_type {
                AccountType::Expense => return Self::Expense,
                AccountType::Income => has_income = true,
                _ => {}
            }
        }
        if has_income { Self::Income } else { Self::Transfer }
    }

    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for DisplayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown display type: {s}")),
        }
    }
}

/// Input for a single line of a journal.
///
/// `amount` is a positive magnitude in the account's currency.
#[derive(Debug, Clone)]
pub struct JournalLineInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Magnitude in the account's currency (must be positive).
    pub amount: Decimal,
    /// Debit or credit.
    pub transaction_type: TransactionType,
    /// Optional memo for this line.
    pub notes: Option<String>,
    /// Fixed rate from account currency to journal currency.
    ///
    /// When absent and the currencies differ, the currency service converts.
    pub exchange_rate: Option<Decimal>,
}

impl JournalLineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self::new(account_id, amount, TransactionType::Debit)
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self::new(account_id, amount, TransactionType::Credit)
    }

    /// Creates a line with the given side.
    #[must_use]
    pub fn new(account_id: AccountId, amount: Decimal, transaction_type: TransactionType) -> Self {
        Self {
            account_id,
            amount,
            transaction_type,
            notes: None,
            exchange_rate: None,
        }
    }

    /// Sets the line memo.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Pins the exchange rate used to convert into the journal currency.
    #[must_use]
    pub fn with_exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }
}

/// Input for creating or replacing a journal.
#[derive(Debug, Clone)]
pub struct JournalInput {
    /// Logical date of the economic event.
    pub journal_date: DateTime<Utc>,
    /// Optional description.
    pub description: Option<String>,
    /// Settlement/reporting currency of the journal.
    pub currency_code: String,
    /// Initial status (`Posted` unless saved as a draft).
    pub status: JournalStatus,
    /// The journal lines (at least 2).
    pub lines: Vec<JournalLineInput>,
}

impl JournalInput {
    /// Creates a posted journal input.
    #[must_use]
    pub fn posted(
        journal_date: DateTime<Utc>,
        currency_code: impl Into<String>,
        lines: Vec<JournalLineInput>,
    ) -> Self {
        Self {
            journal_date,
            description: None,
            currency_code: currency_code.into(),
            status: JournalStatus::Posted,
            lines,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Saves the journal as a draft.
    #[must_use]
    pub fn as_draft(mut self) -> Self {
        self.status = JournalStatus::Draft;
        self
    }
}

/// Outcome of balancing a journal's lines in journal currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalValidation {
    /// Whether debits equal credits within the journal precision.
    pub is_valid: bool,
    /// Sum of debit lines in journal currency.
    pub total_debits: Decimal,
    /// Sum of credit lines in journal currency.
    pub total_credits: Decimal,
    /// `total_debits - total_credits`.
    pub imbalance: Decimal,
}

impl JournalValidation {
    /// The cached journal total: the larger of the two sides.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.total_debits.max(self.total_credits)
    }
}

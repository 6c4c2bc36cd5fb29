//! Conversions between `SeaORM` models and ledger records.

use std::fmt::Display;
use std::str::FromStr;

use folio_core::audit::AuditLog;
use folio_core::ledger::{Account, Journal, Transaction};
use folio_core::store::StoreError;
use folio_shared::types::{AccountId, AuditLogId, JournalId, TransactionId};
use rust_decimal::Decimal;
use sea_orm::Set;

use crate::entities::{accounts, audit_logs, journals, ledger_transactions};

fn parse<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{column} = {value:?}: {e}")))
}

fn decimal(column: &str, value: &str) -> Result<Decimal, StoreError> {
    parse::<Decimal>(column, value)
}

impl accounts::Model {
    pub(crate) fn into_record(self) -> Result<Account, StoreError> {
        Ok(Account {
            id: AccountId::from_uuid(self.id),
            name: self.name,
            account_type: parse("accounts.account_type", &self.account_type)?,
            currency_code: self.currency_code,
            parent_account_id: self.parent_account_id.map(AccountId::from_uuid),
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl From<&Account> for accounts::ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: Set(account.id.into_inner()),
            name: Set(account.name.clone()),
            account_type: Set(account.account_type.as_str().to_string()),
            currency_code: Set(account.currency_code.clone()),
            parent_account_id: Set(account.parent_account_id.map(AccountId::into_inner)),
            description: Set(account.description.clone()),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
            deleted_at: Set(account.deleted_at),
        }
    }
}

impl journals::Model {
    pub(crate) fn into_record(self) -> Result<Journal, StoreError> {
        Ok(Journal {
            id: JournalId::from_uuid(self.id),
            journal_date: self.journal_date,
            description: self.description,
            currency_code: self.currency_code,
            status: parse("journals.status", &self.status)?,
            total_amount: decimal("journals.total_amount", &self.total_amount)?,
            transaction_count: u32::try_from(self.transaction_count).map_err(|e| {
                let count = self.transaction_count;
                StoreError::Corrupt(format!("journals.transaction_count = {count}: {e}"))
            })?,
            display_type: parse("journals.display_type", &self.display_type)?,
            reversing_journal_id: self.reversing_journal_id.map(JournalId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl From<&Journal> for journals::ActiveModel {
    fn from(journal: &Journal) -> Self {
        Self {
            id: Set(journal.id.into_inner()),
            journal_date: Set(journal.journal_date),
            description: Set(journal.description.clone()),
            currency_code: Set(journal.currency_code.clone()),
            status: Set(journal.status.as_str().to_string()),
            total_amount: Set(journal.total_amount.to_string()),
            transaction_count: Set(i64::from(journal.transaction_count)),
            display_type: Set(journal.display_type.as_str().to_string()),
            reversing_journal_id: Set(journal.reversing_journal_id.map(JournalId::into_inner)),
            created_at: Set(journal.created_at),
            updated_at: Set(journal.updated_at),
            deleted_at: Set(journal.deleted_at),
        }
    }
}

impl ledger_transactions::Model {
    pub(crate) fn into_record(self) -> Result<Transaction, StoreError> {
        Ok(Transaction {
            id: TransactionId::from_uuid(self.id),
            journal_id: JournalId::from_uuid(self.journal_id),
            account_id: AccountId::from_uuid(self.account_id),
            amount: decimal("ledger_transactions.amount", &self.amount)?,
            transaction_type: parse(
                "ledger_transactions.transaction_type",
                &self.transaction_type,
            )?,
            currency_code: self.currency_code,
            transaction_date: self.transaction_date,
            notes: self.notes,
            exchange_rate: self
                .exchange_rate
                .as_deref()
                .map(|rate| decimal("ledger_transactions.exchange_rate", rate))
                .transpose()?,
            running_balance: decimal("ledger_transactions.running_balance", &self.running_balance)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl From<&Transaction> for ledger_transactions::ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: Set(tx.id.into_inner()),
            journal_id: Set(tx.journal_id.into_inner()),
            account_id: Set(tx.account_id.into_inner()),
            amount: Set(tx.amount.to_string()),
            transaction_type: Set(tx.transaction_type.as_str().to_string()),
            currency_code: Set(tx.currency_code.clone()),
            transaction_date: Set(tx.transaction_date),
            notes: Set(tx.notes.clone()),
            exchange_rate: Set(tx.exchange_rate.map(|rate| rate.to_string())),
            running_balance: Set(tx.running_balance.to_string()),
            created_at: Set(tx.created_at),
            updated_at: Set(tx.updated_at),
            deleted_at: Set(tx.deleted_at),
        }
    }
}

impl audit_logs::Model {
    pub(crate) fn into_record(self) -> Result<AuditLog, StoreError> {
        Ok(AuditLog {
            id: AuditLogId::from_uuid(self.id),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: parse("audit_logs.action", &self.action)?,
            changes: self.changes,
            timestamp: self.timestamp,
        })
    }
}

impl From<&AuditLog> for audit_logs::ActiveModel {
    fn from(log: &AuditLog) -> Self {
        Self {
            id: Set(log.id.into_inner()),
            entity_type: Set(log.entity_type.clone()),
            entity_id: Set(log.entity_id),
            action: Set(log.action.as_str().to_string()),
            changes: Set(log.changes.clone()),
            timestamp: Set(log.timestamp),
        }
    }
}

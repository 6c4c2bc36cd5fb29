//! Shared fixtures for the SQLite-backed integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_core::LedgerEngine;
use folio_core::currency::RateTable;
use folio_core::ledger::{Account, AccountType, JournalInput, JournalLineInput};
use folio_core::store::RecordStore;
use folio_core::time::{Clock, ManualClock, ManualTimer};
use folio_db::SeaOrmStore;
use folio_db::migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n - 1)
}

/// A fresh, migrated in-memory SQLite store.
pub async fn sqlite_store() -> Arc<SeaOrmStore> {
    let db = folio_db::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(SeaOrmStore::new(db))
}

pub struct TestLedger {
    pub store: Arc<SeaOrmStore>,
    pub clock: Arc<ManualClock>,
    pub engine: LedgerEngine,
}

impl TestLedger {
    pub async fn new() -> Self {
        let store = sqlite_store().await;
        let clock = Arc::new(ManualClock::new(day(30)));
        let rates = RateTable::with_common_currencies("USD").with_rate("EUR", "USD", dec!(1.10));
        let engine = LedgerEngine::builder(store.clone(), Arc::new(rates))
            .clock(clock.clone())
            .timer(Arc::new(ManualTimer::new()))
            .build();
        Self {
            store,
            clock,
            engine,
        }
    }

    pub async fn account(&self, name: &str, account_type: AccountType, currency: &str) -> Account {
        self.clock.advance(Duration::seconds(1));
        let account = Account::new(name, account_type, currency, self.clock.now());
        self.engine.accounts().open_account(account).await.unwrap()
    }

    pub async fn transfer(
        &self,
        date: DateTime<Utc>,
        debit: &Account,
        credit: &Account,
        amount: Decimal,
    ) -> folio_core::journal::JournalRecord {
        self.clock.advance(Duration::seconds(1));
        let input = JournalInput::posted(
            date,
            "USD",
            vec![
                JournalLineInput::debit(debit.id, amount),
                JournalLineInput::credit(credit.id, amount),
            ],
        );
        self.engine.journals().create_journal(input).await.unwrap()
    }

    pub async fn running_balances(&self, account: &Account) -> Vec<Decimal> {
        self.store
            .ledger_transactions(account.id)
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.running_balance)
            .collect()
    }

    pub async fn balance(&self, account: &Account) -> Decimal {
        self.engine.balances().cached_balance(account.id).await.unwrap()
    }
}

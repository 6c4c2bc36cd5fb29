//! Test fixtures shared by the service tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_shared::{LedgerSettings, RebuildSettings};
use rust_decimal_macros::dec;

use crate::currency::RateTable;
use crate::engine::LedgerEngine;
use crate::ledger::{Account, AccountType};
use crate::store::{MemoryStore, RecordStore};
use crate::time::{Clock, ManualClock, ManualTimer};

/// Jan 1 2024, midnight UTC.
pub(crate) fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
        + Duration::days(n - 1)
}

/// USD/EUR/GBP/JPY rates with EUR→USD at 1.10.
pub(crate) fn rates() -> RateTable {
    RateTable::with_common_currencies("USD")
        .with_rate("EUR", "USD", dec!(1.10))
        .with_rate("GBP", "USD", dec!(1.25))
        .with_rate("USD", "JPY", dec!(150))
}

/// An engine over an in-memory store with hand-driven time.
pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub timer: Arc<ManualTimer>,
    pub engine: LedgerEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(day(30)));
        let timer = Arc::new(ManualTimer::new());
        let engine = LedgerEngine::builder(store.clone(), Arc::new(rates()))
            .clock(clock.clone())
            .timer(timer.clone())
            .ledger_settings(settings)
            .rebuild_settings(RebuildSettings::default())
            .build();
        Self {
            store,
            clock,
            timer,
            engine,
        }
    }

    pub async fn account(&self, name: &str, account_type: AccountType, currency: &str) -> Account {
        // Distinct creation times keep list order stable.
        self.clock.advance(Duration::seconds(1));
        let account = Account::new(name, account_type, currency, self.clock.now());
        self.engine.accounts().open_account(account).await.unwrap()
    }

    pub async fn child_account(&self, parent: &Account, name: &str, currency: &str) -> Account {
        self.clock.advance(Duration::seconds(1));
        let account = Account::new(name, parent.account_type, currency, self.clock.now())
            .with_parent(parent.id);
        self.engine.accounts().open_account(account).await.unwrap()
    }

    /// Running balances of an account's ledger lines, oldest first.
    pub async fn running_balances(&self, account: &Account) -> Vec<rust_decimal::Decimal> {
        self.store
            .ledger_transactions(account.id)
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.running_balance)
            .collect()
    }

    pub async fn balance(&self, account: &Account) -> rust_decimal::Decimal {
        self.engine.balances().cached_balance(account.id).await.unwrap()
    }
}

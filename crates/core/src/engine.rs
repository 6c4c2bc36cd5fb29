//! Wiring for the ledger services.
//!
//! [`LedgerEngine`] constructs every service around one record store, one
//! currency service, and one clock/timer pair, so hosts and tests get a
//! consistent object graph without global state.

use std::sync::Arc;

use folio_shared::{AppConfig, IntegritySettings, LedgerSettings, RebuildSettings};
use tracing::info;

use crate::accounts::AccountRegistry;
use crate::audit::{AuditSink, StoreAuditSink};
use crate::balance::BalanceService;
use crate::currency::CurrencyService;
use crate::integrity::{IntegrityVerifier, StartupCheckSummary};
use crate::journal::JournalService;
use crate::scheduler::{RebuildOutcome, RebuildScheduler};
use crate::store::RecordStore;
use crate::time::{Clock, SystemClock, Timer, TokioTimer};

/// The assembled ledger services.
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn RecordStore>,
    accounts: Arc<AccountRegistry>,
    balances: Arc<BalanceService>,
    journals: Arc<JournalService>,
    scheduler: RebuildScheduler,
    integrity: Arc<IntegrityVerifier>,
    integrity_settings: IntegritySettings,
}

impl LedgerEngine {
    /// Starts building an engine over a store and a currency service.
    #[must_use]
    pub fn builder(
        store: Arc<dyn RecordStore>,
        currency: Arc<dyn CurrencyService>,
    ) -> LedgerEngineBuilder {
        LedgerEngineBuilder {
            store,
            currency,
            clock: None,
            timer: None,
            audit: None,
            ledger: LedgerSettings::default(),
            rebuild: RebuildSettings::default(),
            integrity: IntegritySettings::default(),
        }
    }

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Account maintenance.
    #[must_use]
    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// Balance reads and rebuilds.
    #[must_use]
    pub fn balances(&self) -> &BalanceService {
        &self.balances
    }

    /// Journal write path and projections.
    #[must_use]
    pub fn journals(&self) -> &JournalService {
        &self.journals
    }

    /// Background rebuild scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &RebuildScheduler {
        &self.scheduler
    }

    /// Integrity verification and maintenance.
    #[must_use]
    pub fn integrity(&self) -> &IntegrityVerifier {
        &self.integrity
    }

    /// Runs the startup integrity check unless it is disabled.
    pub async fn startup(&self) -> Option<StartupCheckSummary> {
        if self.integrity_settings.check_on_startup {
            Some(self.integrity.run_startup_check().await)
        } else {
            info!("Startup integrity check disabled");
            None
        }
    }

    /// Rebuilds everything still queued. Call before the host exits.
    pub async fn shutdown(&self) -> RebuildOutcome {
        self.scheduler.flush().await
    }
}

/// Builder for [`LedgerEngine`].
pub struct LedgerEngineBuilder {
    store: Arc<dyn RecordStore>,
    currency: Arc<dyn CurrencyService>,
    clock: Option<Arc<dyn Clock>>,
    timer: Option<Arc<dyn Timer>>,
    audit: Option<Arc<dyn AuditSink>>,
    ledger: LedgerSettings,
    rebuild: RebuildSettings,
    integrity: IntegritySettings,
}

impl LedgerEngineBuilder {
    /// Uses the ledger, rebuild, and integrity sections of `config`.
    #[must_use]
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.ledger = config.ledger.clone();
        self.rebuild = config.rebuild;
        self.integrity = config.integrity;
        self
    }

    /// Overrides the clock. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the debounce timer. Defaults to [`TokioTimer`].
    #[must_use]
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Overrides the audit sink. Defaults to a [`StoreAuditSink`] on the same store.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Sets ledger settings.
    #[must_use]
    pub fn ledger_settings(mut self, settings: LedgerSettings) -> Self {
        self.ledger = settings;
        self
    }

    /// Sets rebuild scheduling settings.
    #[must_use]
    pub fn rebuild_settings(mut self, settings: RebuildSettings) -> Self {
        self.rebuild = settings;
        self
    }

    /// Sets integrity settings.
    #[must_use]
    pub fn integrity_settings(mut self, settings: IntegritySettings) -> Self {
        self.integrity = settings;
        self
    }

    /// Assembles the services.
    #[must_use]
    pub fn build(self) -> LedgerEngine {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let timer = self.timer.unwrap_or_else(|| Arc::new(TokioTimer));
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(StoreAuditSink::new(self.store.clone(), clock.clone())));

        let balances = Arc::new(BalanceService::new(
            self.store.clone(),
            self.currency,
            self.ledger,
            clock.clone(),
        ));
        let scheduler = RebuildScheduler::new(balances.clone(), timer, self.rebuild);
        let accounts = Arc::new(AccountRegistry::new(
            self.store.clone(),
            balances.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let journals = Arc::new(JournalService::new(
            self.store.clone(),
            balances.clone(),
            scheduler.clone(),
            audit,
            clock,
        ));
        let integrity = Arc::new(IntegrityVerifier::new(
            self.store.clone(),
            balances.clone(),
            scheduler.clone(),
        ));

        LedgerEngine {
            store: self.store,
            accounts,
            balances,
            journals,
            scheduler,
            integrity,
            integrity_settings: self.integrity,
        }
    }
}

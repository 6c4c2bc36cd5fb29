//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerSettings,
    /// Background rebuild scheduling.
    #[serde(default)]
    pub rebuild: RebuildSettings,
    /// Integrity verification.
    #[serde(default)]
    pub integrity: IntegritySettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`sqlite://...` on device, `postgres://...` for tooling).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

/// Which currency a parent account reports in when its subtree mixes currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedCurrencyTarget {
    /// Convert everything into the configured default currency.
    #[default]
    DefaultCurrency,
    /// Convert everything into the parent account's own currency.
    ParentCurrency,
}

/// Ledger behaviour settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Reporting currency used when a hierarchy mixes currencies.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Precision used for currencies the currency service does not know.
    ///
    /// `None` makes unknown currencies a validation error.
    #[serde(default)]
    pub fallback_precision: Option<u32>,
    /// Currency policy for mixed-currency subtrees.
    #[serde(default)]
    pub mixed_currency_target: MixedCurrencyTarget,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            fallback_precision: None,
            mixed_currency_target: MixedCurrencyTarget::default(),
        }
    }
}

/// Background rebuild scheduling settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RebuildSettings {
    /// Quiet period after the last enqueue before a batch runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Maximum number of accounts rebuilt in one round.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_max_batch_size() -> usize {
    10
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl RebuildSettings {
    /// Returns the debounce window as a `Duration`.
    #[must_use]
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Integrity verification settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntegritySettings {
    /// Run the balance verification and repair pass when the host starts.
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,
}

fn default_check_on_startup() -> bool {
    true
}

impl Default for IntegritySettings {
    fn default() -> Self {
        Self {
            check_on_startup: default_check_on_startup(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FOLIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

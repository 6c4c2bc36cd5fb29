//! Ledger maintenance CLI for Folio.
//!
//! Usage:
//!   folio-doctor check             - Verify cached balances and repair discrepancies
//!   folio-doctor verify <id>       - Verify one account without repairing it
//!   folio-doctor balances          - Print the aggregated balance tree
//!   folio-doctor cleanup           - Purge soft-deleted rows
//!   folio-doctor reset --yes       - Wipe every ledger table

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use folio_core::LedgerEngine;
use folio_core::currency::RateTable;
use folio_core::store::RecordStore;
use folio_db::SeaOrmStore;
use folio_shared::AppConfig;
use folio_shared::types::AccountId;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "folio-doctor")]
#[command(about = "Integrity and maintenance tool for the Folio ledger")]
#[command(version)]
struct Cli {
    /// Database URL, overriding `FOLIO__DATABASE__URL`
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every account and repair discrepancies
    Check,

    /// Verify one account without repairing it
    Verify {
        /// Account id
        account_id: AccountId,
    },

    /// Print the aggregated balance tree
    Balances,

    /// Purge soft-deleted journals, transactions, and accounts
    Cleanup,

    /// Delete every ledger row
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let db = folio_db::connect_with(&config.database).await?;
    info!("Connected to database");

    let rates = RateTable::with_common_currencies(config.ledger.default_currency.clone());
    let engine = LedgerEngine::builder(Arc::new(SeaOrmStore::new(db)), Arc::new(rates))
        .config(&config)
        .build();

    match cli.command {
        Commands::Check => check(&engine).await?,
        Commands::Verify { account_id } => verify(&engine, account_id).await?,
        Commands::Balances => balances(&engine).await?,
        Commands::Cleanup => {
            let purged = engine.integrity().cleanup_database().await?;
            println!(
                "Purged {} journals, {} transactions, {} accounts",
                purged.journals, purged.transactions, purged.accounts
            );
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to wipe the ledger without --yes");
            }
            engine.integrity().reset_database().await?;
            println!("Ledger reset");
        }
    }

    Ok(())
}

async fn check(engine: &LedgerEngine) -> anyhow::Result<()> {
    let summary = engine.integrity().run_startup_check().await;
    println!("Accounts checked:      {}", summary.accounts_checked);
    println!("Discrepancies found:   {}", summary.discrepancies_found);
    println!("Repairs attempted:     {}", summary.repairs_attempted);
    println!("Repairs successful:    {}", summary.repairs_successful);
    println!("Verification errors:   {}", summary.verification_errors);

    if summary.repairs_successful < summary.repairs_attempted || summary.verification_errors > 0 {
        warn!(?summary, "Ledger is not fully consistent");
        bail!("Integrity check finished with unresolved problems");
    }
    Ok(())
}

async fn verify(engine: &LedgerEngine, account_id: AccountId) -> anyhow::Result<()> {
    let check = engine.integrity().verify_account_balance(account_id).await?;
    println!("Account:        {} ({})", check.account_id, check.currency_code);
    println!("Cached:         {}", check.cached_balance);
    println!("Computed:       {}", check.computed_balance);
    println!("Discrepancy:    {}", check.discrepancy);
    println!("Stale lines:    {}", check.mismatched_transactions);
    if !check.matches {
        bail!("Account {account_id} does not match its ledger");
    }
    Ok(())
}

async fn balances(engine: &LedgerEngine) -> anyhow::Result<()> {
    let accounts = engine.store().list_accounts().await?;
    let tree = engine.balances().balance_tree().await?;

    for node in tree {
        let name = accounts
            .iter()
            .find(|a| a.id == node.account_id)
            .map_or("?", |a| a.name.as_str());
        println!(
            "{:indent$}{name}: {} {}",
            "",
            node.balance,
            node.currency_code,
            indent = node.depth * 2
        );
        for (currency, subtotal) in &node.child_balances {
            println!("{:indent$}  {currency}: {subtotal}", "", indent = node.depth * 2);
        }
    }
    Ok(())
}

//! Demo data seeder for Folio development and testing.
//!
//! Seeds a small personal chart of accounts and a month of journals through
//! the journal service, so every running balance is produced by the engine.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use folio_core::LedgerEngine;
use folio_core::currency::RateTable;
use folio_core::ledger::{Account, AccountType, JournalInput, JournalLineInput};
use folio_core::store::RecordStore;
use folio_db::SeaOrmStore;
use folio_db::migration::{Migrator, MigratorTrait};
use folio_shared::AppConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug,seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = folio_db::connect_with(&config.database).await?;
    Migrator::up(&db, None).await?;
    info!("Connected to database");

    let store = Arc::new(SeaOrmStore::new(db));
    let rates = RateTable::with_common_currencies(config.ledger.default_currency.clone())
        .with_rate("EUR", "USD", dec!(1.08));
    let engine = LedgerEngine::builder(store, Arc::new(rates))
        .config(&config)
        .build();

    if !engine.store().list_accounts().await?.is_empty() {
        info!("Accounts already exist, skipping seed");
        return Ok(());
    }

    let chart = seed_accounts(&engine).await?;
    let posted = seed_journals(&engine, &chart).await?;

    let outcome = engine.shutdown().await;
    info!(
        journals = posted,
        rebuilt = outcome.rebuilt.len(),
        failed = outcome.failed.len(),
        "Seeding complete"
    );
    Ok(())
}

struct Chart {
    checking: Account,
    savings: Account,
    euro_wallet: Account,
    opening: Account,
    salary: Account,
    groceries: Account,
    dining: Account,
    rent: Account,
}

async fn open(engine: &LedgerEngine, account: Account) -> anyhow::Result<Account> {
    let name = account.name.clone();
    let account = engine.accounts().open_account(account).await?;
    info!(account_id = %account.id, %name, "Seeded account");
    Ok(account)
}

/// Seeds the chart of accounts. Expenses hang off a "Living" parent so the
/// balance tree has something to aggregate.
async fn seed_accounts(engine: &LedgerEngine) -> anyhow::Result<Chart> {
    let now = Utc::now();
    let account = |name: &str, account_type, currency: &str| {
        Account::new(name, account_type, currency, now)
    };

    let cash = open(engine, account("Cash & Bank", AccountType::Asset, "USD")).await?;
    let checking =
        open(engine, account("Checking", AccountType::Asset, "USD").with_parent(cash.id)).await?;
    let savings =
        open(engine, account("Savings", AccountType::Asset, "USD").with_parent(cash.id)).await?;
    let euro_wallet = open(
        engine,
        account("Euro Wallet", AccountType::Asset, "EUR")
            .with_parent(cash.id)
            .with_description("Travel money"),
    )
    .await?;
    let opening = open(engine, account("Opening Balance", AccountType::Equity, "USD")).await?;
    let salary = open(engine, account("Salary", AccountType::Income, "USD")).await?;
    let living = open(engine, account("Living", AccountType::Expense, "USD")).await?;
    let groceries = open(
        engine,
        account("Groceries", AccountType::Expense, "USD").with_parent(living.id),
    )
    .await?;
    let dining = open(
        engine,
        account("Dining", AccountType::Expense, "USD").with_parent(living.id),
    )
    .await?;
    let rent = open(
        engine,
        account("Rent", AccountType::Expense, "USD").with_parent(living.id),
    )
    .await?;

    Ok(Chart {
        checking,
        savings,
        euro_wallet,
        opening,
        salary,
        groceries,
        dining,
        rent,
    })
}

fn transfer(
    date: DateTime<Utc>,
    description: &str,
    debit: &Account,
    credit: &Account,
    amount: Decimal,
) -> JournalInput {
    JournalInput::posted(
        date,
        "USD",
        vec![
            JournalLineInput::debit(debit.id, amount),
            JournalLineInput::credit(credit.id, amount),
        ],
    )
    .with_description(description)
}

/// Seeds 30 days of activity, deliberately out of date order so the
/// rebuild scheduler has backdated work to do.
async fn seed_journals(engine: &LedgerEngine, chart: &Chart) -> anyhow::Result<usize> {
    let start = Utc::now() - Duration::days(30);
    let at = |offset: i64| start + Duration::days(offset);

    let mut inputs = vec![
        transfer(at(0), "Opening balance", &chart.checking, &chart.opening, dec!(2500.00)),
        transfer(at(1), "Salary", &chart.checking, &chart.salary, dec!(3200.00)),
        transfer(at(2), "Rent", &chart.rent, &chart.checking, dec!(1450.00)),
        transfer(at(9), "Move to savings", &chart.savings, &chart.checking, dec!(500.00)),
        transfer(at(15), "Salary", &chart.checking, &chart.salary, dec!(3200.00)),
    ];

    let groceries = [
        (3, dec!(82.17)),
        (10, dec!(64.90)),
        (17, dec!(103.45)),
        (24, dec!(58.02)),
    ];
    for (offset, amount) in groceries {
        inputs.push(transfer(at(offset), "Groceries", &chart.groceries, &chart.checking, amount));
    }
    for (offset, amount) in [(5, dec!(23.50)), (12, dec!(41.80)), (20, dec!(18.25))] {
        inputs.push(transfer(at(offset), "Dinner out", &chart.dining, &chart.checking, amount));
    }

    // Converted into USD at the table's EUR rate.
    inputs.push(
        JournalInput::posted(
            at(7),
            "USD",
            vec![
                JournalLineInput::debit(chart.euro_wallet.id, dec!(200.00)),
                JournalLineInput::credit(chart.checking.id, dec!(216.00)),
            ],
        )
        .with_description("Buy euros"),
    );

    let mut posted = 0;
    for input in inputs {
        let record = engine.journals().create_journal(input).await?;
        info!(journal_id = %record.journal.id, "Seeded journal");
        posted += 1;
    }

    let draft =
        transfer(at(28), "Planned dinner", &chart.dining, &chart.checking, dec!(60.00)).as_draft();
    engine.journals().create_journal(draft).await?;

    Ok(posted)
}

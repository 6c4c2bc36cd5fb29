use chrono::Duration;
use rust_decimal_macros::dec;

use crate::ledger::{AccountType, JournalInput, JournalLineInput};
use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::testing::{Harness, day};
use crate::time::Clock;

async fn salary_history(harness: &Harness) -> (crate::ledger::Account, crate::ledger::Account) {
    let checking = harness.account("Checking", AccountType::Asset, "USD").await;
    let salary = harness.account("Salary", AccountType::Income, "USD").await;
    for (n, amount) in [(1, dec!(100.00)), (2, dec!(50.00)), (3, dec!(25.00))] {
        harness.clock.advance(Duration::seconds(1));
        let input = JournalInput::posted(
            day(n),
            "USD",
            vec![
                JournalLineInput::debit(checking.id, amount),
                JournalLineInput::credit(salary.id, amount),
            ],
        );
        harness.engine.journals().create_journal(input).await.unwrap();
    }
    (checking, salary)
}

async fn corrupt_line(harness: &Harness, account: &crate::ledger::Account, index: usize) {
    let lines = harness.store.ledger_transactions(account.id).await.unwrap();
    let batch = WriteBatch::new().with(WriteOp::SetRunningBalance {
        transaction_id: lines[index].id,
        running_balance: dec!(999.99),
        updated_at: harness.clock.now(),
    });
    harness.store.apply(batch).await.unwrap();
}

#[tokio::test]
async fn test_clean_ledger_verifies() {
    let harness = Harness::new();
    let (checking, _) = salary_history(&harness).await;

    let check = harness
        .engine
        .integrity()
        .verify_account_balance(checking.id)
        .await
        .unwrap();

    assert!(check.matches);
    assert_eq!(check.cached_balance, dec!(175.00));
    assert_eq!(check.computed_balance, dec!(175.00));
    assert!(check.discrepancy.is_zero());
    assert_eq!(check.mismatched_transactions, 0);
}

#[tokio::test]
async fn test_scenario_c_startup_check_repairs_corruption() {
    let harness = Harness::new();
    let (checking, salary) = salary_history(&harness).await;
    corrupt_line(&harness, &checking, 2).await;

    let check = harness
        .engine
        .integrity()
        .verify_account_balance(checking.id)
        .await
        .unwrap();
    assert!(!check.matches);
    assert_eq!(check.cached_balance, dec!(999.99));
    assert_eq!(check.discrepancy, dec!(-824.99));

    let summary = harness.engine.integrity().run_startup_check().await;

    assert_eq!(summary.accounts_checked, 2);
    assert_eq!(summary.discrepancies_found, 1);
    assert_eq!(summary.repairs_attempted, 1);
    assert_eq!(summary.repairs_successful, 1);
    assert_eq!(summary.verification_errors, 0);
    assert_eq!(harness.balance(&checking).await, dec!(175.00));
    assert_eq!(harness.balance(&salary).await, dec!(175.00));
}

#[tokio::test]
async fn test_stale_middle_line_is_a_discrepancy() {
    let harness = Harness::new();
    let (checking, _) = salary_history(&harness).await;
    corrupt_line(&harness, &checking, 0).await;

    let check = harness
        .engine
        .integrity()
        .verify_account_balance(checking.id)
        .await
        .unwrap();

    // The final balance is intact but an earlier line is wrong.
    assert!(check.discrepancy.is_zero());
    assert_eq!(check.mismatched_transactions, 1);
    assert!(!check.matches);

    let report = harness.engine.balances().rebuild(checking.id).await.unwrap();
    assert_eq!(report.transactions_checked, 3);
    assert_eq!(report.transactions_updated, 1);
    assert_eq!(
        harness.running_balances(&checking).await,
        vec![dec!(100.00), dec!(150.00), dec!(175.00)]
    );
}

#[tokio::test]
async fn test_verify_all_covers_every_account() {
    let harness = Harness::new();
    salary_history(&harness).await;
    harness.account("Savings", AccountType::Asset, "USD").await;

    let checks = harness
        .engine
        .integrity()
        .verify_all_account_balances()
        .await
        .unwrap();

    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(|c| c.matches));
}

#[tokio::test]
async fn test_startup_check_counts_unverifiable_accounts() {
    let harness = Harness::new();
    salary_history(&harness).await;
    // Bypass the registry so the account's currency is unknown.
    let odd = crate::ledger::Account::new("Odd", AccountType::Asset, "XYZ", harness.clock.now());
    harness
        .store
        .apply(WriteBatch::new().with(WriteOp::PutAccount(odd)))
        .await
        .unwrap();

    let summary = harness.engine.integrity().run_startup_check().await;

    assert_eq!(summary.accounts_checked, 2);
    assert_eq!(summary.verification_errors, 1);
    assert_eq!(summary.discrepancies_found, 0);
}

#[tokio::test]
async fn test_startup_respects_settings() {
    let harness = Harness::new();
    salary_history(&harness).await;

    let summary = harness.engine.startup().await.unwrap();
    assert_eq!(summary.discrepancies_found, 0);
}

#[tokio::test]
async fn test_cleanup_purges_deleted_journals() {
    let harness = Harness::new();
    let (checking, _) = salary_history(&harness).await;
    let lines = harness.store.ledger_transactions(checking.id).await.unwrap();
    harness
        .engine
        .journals()
        .delete_journal(lines[0].journal_id)
        .await
        .unwrap();
    harness.engine.scheduler().flush().await;

    let purged = harness.engine.integrity().cleanup_database().await.unwrap();

    assert_eq!(purged.journals, 1);
    assert_eq!(purged.transactions, 2);
    assert_eq!(purged.accounts, 0);
    assert_eq!(harness.balance(&checking).await, dec!(75.00));
}

#[tokio::test]
async fn test_reset_wipes_store_and_queue() {
    let harness = Harness::new();
    let (checking, salary) = salary_history(&harness).await;
    harness.clock.advance(Duration::seconds(1));
    let input = JournalInput::posted(
        day(1),
        "USD",
        vec![
            JournalLineInput::debit(checking.id, dec!(1)),
            JournalLineInput::credit(salary.id, dec!(1)),
        ],
    );
    harness.engine.journals().create_journal(input).await.unwrap();
    assert!(harness.engine.scheduler().has_pending());

    harness.engine.integrity().reset_database().await.unwrap();

    assert!(!harness.engine.scheduler().has_pending());
    assert!(harness.store.list_accounts().await.unwrap().is_empty());
}

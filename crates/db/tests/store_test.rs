//! Record store contract tests against SQLite.
//!
//! Each test runs the migrations on a private in-memory database.

mod common;

use chrono::Duration;
use folio_core::audit::{AuditAction, AuditLog};
use folio_core::ledger::{
    Account, AccountType, DisplayType, Journal, JournalStatus, Transaction, TransactionType,
};
use folio_core::store::{RecordStore, StoreError, WriteBatch, WriteOp};
use folio_shared::types::{AccountId, AuditLogId, JournalId, PageRequest, TransactionId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use common::{day, sqlite_store};

fn journal(status: JournalStatus, n: i64) -> Journal {
    Journal {
        id: JournalId::new(),
        journal_date: day(n),
        description: Some(format!("Journal {n}")),
        currency_code: "USD".to_string(),
        status,
        total_amount: dec!(10.25),
        transaction_count: 1,
        display_type: DisplayType::Transfer,
        reversing_journal_id: None,
        created_at: day(n),
        updated_at: day(n),
        deleted_at: None,
    }
}

fn line(journal: &Journal, account_id: AccountId, running_balance: Decimal) -> Transaction {
    Transaction {
        id: TransactionId::new(),
        journal_id: journal.id,
        account_id,
        amount: dec!(10.25),
        transaction_type: TransactionType::Debit,
        currency_code: "USD".to_string(),
        transaction_date: journal.journal_date,
        notes: None,
        exchange_rate: None,
        running_balance,
        created_at: journal.created_at,
        updated_at: journal.created_at,
        deleted_at: None,
    }
}

fn audit(entity: JournalId, action: AuditAction, changes: serde_json::Value, n: i64) -> AuditLog {
    AuditLog {
        id: AuditLogId::new(),
        entity_type: "journal".to_string(),
        entity_id: entity.into_inner(),
        action,
        changes,
        timestamp: day(n),
    }
}

fn put(journal: &Journal, lines: &[Transaction]) -> WriteBatch {
    let mut batch = WriteBatch::new().with(WriteOp::PutJournal(journal.clone()));
    batch.extend(lines.iter().cloned().map(WriteOp::PutTransaction));
    batch
}

#[tokio::test]
async fn test_account_round_trip_and_soft_delete() {
    let store = sqlite_store().await;
    let parent = Account::new("Assets", AccountType::Asset, "USD", day(1));
    let child = Account::new("Checking", AccountType::Asset, "USD", day(2))
        .with_parent(parent.id)
        .with_description("Main account");

    store
        .apply(
            WriteBatch::new()
                .with(WriteOp::PutAccount(parent.clone()))
                .with(WriteOp::PutAccount(child.clone())),
        )
        .await
        .unwrap();

    let loaded = store.find_account(child.id).await.unwrap().unwrap();
    assert_eq!(loaded, child);
    assert_eq!(store.list_accounts().await.unwrap(), vec![parent.clone(), child.clone()]);

    let closed = Account {
        deleted_at: Some(day(3)),
        ..child.clone()
    };
    store
        .apply(WriteBatch::new().with(WriteOp::PutAccount(closed)))
        .await
        .unwrap();

    assert!(store.find_account(child.id).await.unwrap().is_none());
    assert_eq!(store.find_accounts(&[parent.id, child.id]).await.unwrap(), vec![parent]);
    assert!(store.find_accounts(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_decimals_are_exact() {
    let store = sqlite_store().await;
    let account = Account::new("Brokerage", AccountType::Asset, "USD", day(1));
    let header = journal(JournalStatus::Posted, 2);
    let mut precise = line(&header, account.id, dec!(12345678901234.5678));
    precise.exchange_rate = Some(dec!(1.0999999999));

    store
        .apply(put(&header, &[precise.clone()]).with(WriteOp::PutAccount(account.clone())))
        .await
        .unwrap();

    let stored = store.journal_transactions(header.id).await.unwrap();
    assert_eq!(stored[0].running_balance, dec!(12345678901234.5678));
    assert_eq!(stored[0].exchange_rate, Some(dec!(1.0999999999)));
    assert_eq!(
        store.find_journal(header.id).await.unwrap().unwrap().total_amount,
        dec!(10.25)
    );
}

#[tokio::test]
async fn test_ledger_order_and_visibility() {
    let store = sqlite_store().await;
    let account = Account::new("Checking", AccountType::Asset, "USD", day(1));
    store
        .apply(WriteBatch::new().with(WriteOp::PutAccount(account.clone())))
        .await
        .unwrap();

    let late = journal(JournalStatus::Posted, 5);
    let early = journal(JournalStatus::Posted, 2);
    let draft = journal(JournalStatus::Draft, 3);
    let doomed = journal(JournalStatus::Posted, 4);
    // Inserted out of date order.
    store.apply(put(&late, &[line(&late, account.id, dec!(3))])).await.unwrap();
    store.apply(put(&early, &[line(&early, account.id, dec!(1))])).await.unwrap();
    store.apply(put(&draft, &[line(&draft, account.id, dec!(0))])).await.unwrap();
    store.apply(put(&doomed, &[line(&doomed, account.id, dec!(2))])).await.unwrap();
    store
        .apply(WriteBatch::new().with(WriteOp::SoftDeleteJournal {
            journal_id: doomed.id,
            deleted_at: day(6),
        }))
        .await
        .unwrap();

    let ledger = store.ledger_transactions(account.id).await.unwrap();
    let journals: Vec<JournalId> = ledger.iter().map(|tx| tx.journal_id).collect();
    assert_eq!(journals, vec![early.id, late.id]);

    let latest = store.latest_ledger_transaction(account.id).await.unwrap().unwrap();
    assert_eq!(latest.journal_id, late.id);

    let (page, total) = store
        .account_transactions_page(account.id, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(total, 3);
    let newest: Vec<JournalId> = page.iter().map(|tx| tx.journal_id).collect();
    assert_eq!(newest, vec![late.id, draft.id]);

    let (rest, _) = store
        .account_transactions_page(account.id, PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].journal_id, early.id);

    assert!(store.find_journal(doomed.id).await.unwrap().is_none());
    assert!(store.journal_transactions(doomed.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_batch_rolls_back() {
    let store = sqlite_store().await;
    let header = journal(JournalStatus::Posted, 2);

    let result = store
        .apply(
            WriteBatch::new()
                .with(WriteOp::PutJournal(header.clone()))
                .with(WriteOp::SetRunningBalance {
                    transaction_id: TransactionId::new(),
                    running_balance: dec!(1),
                    updated_at: day(2),
                }),
        )
        .await;

    assert!(matches!(result, Err(StoreError::NotFound { entity: "transaction", .. })));
    assert!(store.find_journal(header.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_line_requires_journal() {
    let store = sqlite_store().await;
    let parent = journal(JournalStatus::Posted, 2);
    let orphan = line(&parent, AccountId::new(), dec!(1));

    let result = store
        .apply(WriteBatch::new().with(WriteOp::PutTransaction(orphan)))
        .await;

    assert!(matches!(result, Err(StoreError::NotFound { entity: "journal", .. })));
}

#[tokio::test]
async fn test_set_running_balance_updates_line() {
    let store = sqlite_store().await;
    let account_id = AccountId::new();
    let header = journal(JournalStatus::Posted, 2);
    let tx = line(&header, account_id, dec!(10.25));
    store.apply(put(&header, &[tx.clone()])).await.unwrap();

    store
        .apply(WriteBatch::new().with(WriteOp::SetRunningBalance {
            transaction_id: tx.id,
            running_balance: dec!(99.99),
            updated_at: day(3),
        }))
        .await
        .unwrap();

    let stored = store.ledger_transactions(account_id).await.unwrap();
    assert_eq!(stored[0].running_balance, dec!(99.99));
    assert_eq!(stored[0].updated_at, day(3));
}

#[tokio::test]
async fn test_audit_trail_in_order() {
    let store = sqlite_store().await;
    let entity = JournalId::new();
    let created = audit(entity, AuditAction::Create, json!({"after": {}}), 1);
    let updated = audit(
        entity,
        AuditAction::Update,
        json!({"before": {}, "after": {"status": "posted"}}),
        2,
    );

    store
        .apply(
            WriteBatch::new()
                .with(WriteOp::AppendAudit(updated.clone()))
                .with(WriteOp::AppendAudit(created.clone())),
        )
        .await
        .unwrap();

    let trail = store.audit_trail(entity.into_inner()).await.unwrap();
    assert_eq!(trail, vec![created, updated]);
}

#[tokio::test]
async fn test_purge_and_reset() {
    let store = sqlite_store().await;
    let account = Account::new("Checking", AccountType::Asset, "USD", day(1));
    let closed = Account {
        deleted_at: Some(day(2)),
        ..Account::new("Old", AccountType::Asset, "USD", day(1))
    };
    let kept = journal(JournalStatus::Posted, 2);
    let dropped = journal(JournalStatus::Posted, 3);
    store
        .apply(
            put(&kept, &[line(&kept, account.id, dec!(1))])
                .with(WriteOp::PutAccount(account.clone()))
                .with(WriteOp::PutAccount(closed)),
        )
        .await
        .unwrap();
    store
        .apply(put(
            &dropped,
            &[line(&dropped, account.id, dec!(2)), line(&dropped, account.id, dec!(3))],
        ))
        .await
        .unwrap();
    store
        .apply(WriteBatch::new().with(WriteOp::SoftDeleteJournal {
            journal_id: dropped.id,
            deleted_at: day(4) + Duration::hours(1),
        }))
        .await
        .unwrap();

    let purged = store.purge_deleted().await.unwrap();
    assert_eq!(purged.journals, 1);
    assert_eq!(purged.transactions, 2);
    assert_eq!(purged.accounts, 1);
    assert_eq!(store.ledger_transactions(account.id).await.unwrap().len(), 1);

    store.reset().await.unwrap();
    assert!(store.list_accounts().await.unwrap().is_empty());
    assert!(store.find_journal(kept.id).await.unwrap().is_none());
}

//! Property tests for balance computation.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use folio_shared::MixedCurrencyTarget;
use folio_shared::types::{AccountId, JournalId, TransactionId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::hierarchy::{AccountNode, RollupPolicy, aggregate};
use super::running::{append, replay};
use crate::currency::RateTable;
use crate::ledger::{AccountType, JournalInput, JournalLineInput, Transaction, TransactionType};
use crate::testing::{Harness, day};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn line(amount: Decimal, transaction_type: TransactionType) -> Transaction {
    let now = Utc::now();
    Transaction {
        id: TransactionId::new(),
        journal_id: JournalId::new(),
        account_id: AccountId::nil(),
        amount,
        transaction_type,
        currency_code: "USD".to_string(),
        transaction_date: now,
        notes: None,
        exchange_rate: None,
        running_balance: Decimal::ZERO,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn lines_strategy() -> impl Strategy<Value = Vec<(i64, bool)>> {
    prop::collection::vec((1i64..1_000_000i64, any::<bool>()), 0..40)
}

/// Dated postings: (day, cents).
fn postings_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((1i64..=10, 1i64..100_000), 1..12)
}

async fn post_all(postings: &[(i64, i64)]) -> Vec<Decimal> {
    let harness = Harness::new();
    let checking = harness.account("Checking", AccountType::Asset, "USD").await;
    let salary = harness.account("Salary", AccountType::Income, "USD").await;

    for &(n, cents) in postings {
        harness.clock.advance(Duration::seconds(1));
        let amount = Decimal::new(cents, 2);
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
    harness.engine.scheduler().flush().await;
    harness.running_balances(&checking).await
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Appending every line to an empty account matches a full replay.
    #[test]
    fn prop_append_matches_replay(
        raw in lines_strategy(),
        account_type in prop::sample::select(AccountType::ALL.to_vec()),
    ) {
        let mut lines: Vec<Transaction> = raw
            .iter()
            .map(|&(cents, debit)| {
                let side = if debit { TransactionType::Debit } else { TransactionType::Credit };
                line(Decimal::new(cents, 2), side)
            })
            .collect();

        let expected = replay(&lines, account_type, 2).unwrap();

        // Split into two appends to mimic successive journals.
        let mid = lines.len() / 2;
        let (head, tail) = lines.split_at_mut(mid);
        let mut head: Vec<&mut Transaction> = head.iter_mut().collect();
        let mut tail: Vec<&mut Transaction> = tail.iter_mut().collect();
        let after_head = append(Decimal::ZERO, &mut head, account_type, 2).unwrap();
        let balance = append(after_head, &mut tail, account_type, 2).unwrap();

        prop_assert_eq!(balance, expected.balance);
        for (tx, step) in lines.iter().zip(&expected.steps) {
            prop_assert_eq!(tx.running_balance, step.current_balance);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Posting in any order and flushing gives the same running balances as
    /// posting in chronological order.
    #[test]
    fn prop_backdated_inserts_converge(postings in postings_strategy()) {
        let mut chronological = postings.clone();
        chronological.sort_by_key(|&(n, _)| n);

        let mut expected = Vec::with_capacity(chronological.len());
        let mut balance = Decimal::ZERO;
        for &(_, cents) in &chronological {
            balance += Decimal::new(cents, 2);
            expected.push(balance);
        }

        let rt = runtime();
        let shuffled = rt.block_on(post_all(&postings));
        let ordered = rt.block_on(post_all(&chronological));

        prop_assert_eq!(&shuffled, &expected);
        prop_assert_eq!(&ordered, &expected);
    }

    /// In a single-currency tree every parent equals its own balance plus
    /// its immediate children's aggregated balances.
    #[test]
    fn prop_parent_sums_children(
        parents in prop::collection::vec(any::<prop::sample::Index>(), 1..20),
        balances in prop::collection::vec(-1_000_000i64..1_000_000i64, 20),
    ) {
        let ids: Vec<AccountId> = (0..=parents.len()).map(|_| AccountId::new()).collect();
        let nodes: Vec<AccountNode> = ids
            .iter()
            .enumerate()
            .map(|(i, &account_id)| AccountNode {
                account_id,
                // Each node hangs off an earlier one, so the tree is acyclic.
                parent_id: (i > 0).then(|| ids[parents[i - 1].index(i)]),
                currency_code: "USD".to_string(),
                balance: Decimal::new(balances[i % balances.len()], 2),
            })
            .collect();
        let policy = RollupPolicy {
            default_currency: "USD".to_string(),
            mixed_target: MixedCurrencyTarget::DefaultCurrency,
            fallback_precision: None,
        };
        let rates = RateTable::with_common_currencies("USD");

        let aggregated = runtime().block_on(aggregate(&nodes, &policy, &rates)).unwrap();
        let by_id: HashMap<AccountId, Decimal> =
            aggregated.iter().map(|a| (a.account_id, a.balance)).collect();

        for node in &nodes {
            let children: Decimal = nodes
                .iter()
                .filter(|child| child.parent_id == Some(node.account_id))
                .map(|child| by_id[&child.account_id])
                .sum();
            prop_assert_eq!(by_id[&node.account_id], node.balance + children);
        }
        let root_total: Decimal = nodes.iter().map(|n| n.balance).sum();
        prop_assert_eq!(by_id[&ids[0]], root_total);
    }
}

//! Hierarchical balance aggregation.
//!
//! Accounts are aggregated deepest-first so every child is final before its
//! parent reads it. A subtree whose accounts all share one currency reports
//! in that currency without touching the currency service. A mixed subtree
//! reports in the policy's target currency and keeps a per-currency
//! breakdown in `child_balances`.

use std::collections::{BTreeMap, HashMap};

use folio_shared::MixedCurrencyTarget;
use folio_shared::types::{AccountId, round_to_precision};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::currency::{CurrencyService, precision_or_fallback};
use crate::ledger::LedgerError;

/// One account's own balance and place in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNode {
    /// The account.
    pub account_id: AccountId,
    /// Parent account, if any.
    pub parent_id: Option<AccountId>,
    /// The account's own currency.
    pub currency_code: String,
    /// The account's own cached balance.
    pub balance: Decimal,
}

/// Rules for choosing a mixed subtree's currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupPolicy {
    /// Reporting currency for [`MixedCurrencyTarget::DefaultCurrency`].
    pub default_currency: String,
    /// Which currency mixed subtrees report in.
    pub mixed_target: MixedCurrencyTarget,
    /// Precision for currencies the service does not know.
    pub fallback_precision: Option<u32>,
}

/// An account's aggregated balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedBalance {
    /// The account.
    pub account_id: AccountId,
    /// Distance from the root (roots are 0).
    pub depth: usize,
    /// Currency of `balance`.
    pub currency_code: String,
    /// The account's own balance, in its own currency.
    pub own_balance: Decimal,
    /// Own balance plus all descendants, in `currency_code`.
    pub balance: Decimal,
    /// Per-currency subtotals, present only for mixed subtrees.
    pub child_balances: BTreeMap<String, Decimal>,
}

/// Computes each account's depth, rejecting cycles.
///
/// A parent id that does not match any node makes the account a root.
pub fn depths(nodes: &[AccountNode]) -> Result<HashMap<AccountId, usize>, LedgerError> {
    let parents: HashMap<AccountId, Option<AccountId>> =
        nodes.iter().map(|n| (n.account_id, n.parent_id)).collect();
    let mut depths: HashMap<AccountId, usize> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        let mut path = Vec::new();
        let mut current = node.account_id;
        let base = loop {
            if let Some(&known) = depths.get(&current) {
                break known + 1;
            }
            if path.contains(&current) {
                return Err(LedgerError::AccountCycle(current));
            }
            path.push(current);
            match parents.get(&current).copied().flatten() {
                Some(parent) if parents.contains_key(&parent) => current = parent,
                _ => break 0,
            }
        };
        // `path` runs child → root; assign depths root-first.
        for (offset, id) in path.iter().rev().enumerate() {
            depths.insert(*id, base + offset);
        }
    }

    Ok(depths)
}

/// Aggregates balances up the hierarchy.
pub async fn aggregate(
    nodes: &[AccountNode],
    policy: &RollupPolicy,
    currency: &dyn CurrencyService,
) -> Result<Vec<AggregatedBalance>, LedgerError> {
    let depths = depths(nodes)?;
    let by_id: HashMap<AccountId, &AccountNode> = nodes.iter().map(|n| (n.account_id, n)).collect();

    let mut children: HashMap<AccountId, Vec<AccountId>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id.filter(|p| by_id.contains_key(p)) {
            children.entry(parent).or_default().push(node.account_id);
        }
    }

    let mut order: Vec<&AccountNode> = nodes.iter().collect();
    order.sort_by_key(|n| std::cmp::Reverse(depths.get(&n.account_id).copied().unwrap_or(0)));

    let mut done: HashMap<AccountId, AggregatedBalance> = HashMap::with_capacity(nodes.len());
    let mut subtree_currencies: HashMap<AccountId, Vec<String>> = HashMap::new();

    for node in order {
        let kids: Vec<&AggregatedBalance> = children
            .get(&node.account_id)
            .map(|ids| ids.iter().filter_map(|id| done.get(id)).collect())
            .unwrap_or_default();

        let mut currencies = vec![node.currency_code.clone()];
        for kid in &kids {
            for code in subtree_currencies.get(&kid.account_id).into_iter().flatten() {
                if !currencies.contains(code) {
                    currencies.push(code.clone());
                }
            }
        }

        let mixed = currencies.len() > 1;
        let target = if mixed {
            match policy.mixed_target {
                MixedCurrencyTarget::DefaultCurrency => policy.default_currency.clone(),
                MixedCurrencyTarget::ParentCurrency => node.currency_code.clone(),
            }
        } else {
            node.currency_code.clone()
        };
        let precision =
            precision_or_fallback(currency, &target, policy.fallback_precision).await?;

        let overflow = || LedgerError::BalanceOverflow(node.account_id);
        let mut total =
            to_target(currency, node.balance, &node.currency_code, &target, precision).await?;
        let mut child_balances = BTreeMap::new();
        if mixed {
            child_balances.insert(node.currency_code.clone(), node.balance);
        }

        for kid in &kids {
            let converted =
                to_target(currency, kid.balance, &kid.currency_code, &target, precision).await?;
            let sum = total.checked_add(converted).ok_or_else(overflow)?;
            total = round_to_precision(sum, precision);
            if mixed {
                let subtotal = child_balances
                    .entry(kid.currency_code.clone())
                    .or_insert(Decimal::ZERO);
                *subtotal = subtotal.checked_add(kid.balance).ok_or_else(overflow)?;
            }
        }

        debug!(
            account_id = %node.account_id,
            currency = %target,
            mixed,
            children = kids.len(),
            "Aggregated account balance"
        );

        subtree_currencies.insert(node.account_id, currencies);
        done.insert(
            node.account_id,
            AggregatedBalance {
                account_id: node.account_id,
                depth: depths.get(&node.account_id).copied().unwrap_or(0),
                currency_code: target,
                own_balance: node.balance,
                balance: total,
                child_balances,
            },
        );
    }

    Ok(nodes
        .iter()
        .filter_map(|n| done.remove(&n.account_id))
        .collect())
}

async fn to_target(
    currency: &dyn CurrencyService,
    amount: Decimal,
    from: &str,
    to: &str,
    precision: u32,
) -> Result<Decimal, LedgerError> {
    if from == to {
        return Ok(amount);
    }
    let converted = currency.convert(amount, from, to).await?;
    Ok(round_to_precision(converted, precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{CurrencyError, MockCurrencyService, RateTable};
    use rust_decimal_macros::dec;

    fn node(
        id: AccountId,
        parent: Option<AccountId>,
        currency: &str,
        balance: Decimal,
    ) -> AccountNode {
        AccountNode {
            account_id: id,
            parent_id: parent,
            currency_code: currency.to_string(),
            balance,
        }
    }

    fn policy(target: MixedCurrencyTarget) -> RollupPolicy {
        RollupPolicy {
            default_currency: "USD".to_string(),
            mixed_target: target,
            fallback_precision: None,
        }
    }

    fn find(result: &[AggregatedBalance], id: AccountId) -> &AggregatedBalance {
        result.iter().find(|b| b.account_id == id).unwrap()
    }

    #[test]
    fn test_depths() {
        let (root, mid, leaf) = (AccountId::new(), AccountId::new(), AccountId::new());
        let nodes = vec![
            node(leaf, Some(mid), "USD", dec!(0)),
            node(mid, Some(root), "USD", dec!(0)),
            node(root, None, "USD", dec!(0)),
        ];

        let depths = depths(&nodes).unwrap();
        assert_eq!(depths[&root], 0);
        assert_eq!(depths[&mid], 1);
        assert_eq!(depths[&leaf], 2);
    }

    #[test]
    fn test_missing_parent_is_root() {
        let orphan = AccountId::new();
        let depths = depths(&[node(orphan, Some(AccountId::new()), "USD", dec!(0))]).unwrap();
        assert_eq!(depths[&orphan], 0);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let nodes = vec![node(a, Some(b), "USD", dec!(0)), node(b, Some(a), "USD", dec!(0))];
        assert!(matches!(depths(&nodes), Err(LedgerError::AccountCycle(_))));
    }

    #[tokio::test]
    async fn test_single_currency_never_converts() {
        let mut currency = MockCurrencyService::new();
        currency.expect_precision().returning(|_| Ok(2));
        currency.expect_convert().never();

        let (parent, food, fuel) = (AccountId::new(), AccountId::new(), AccountId::new());
        let nodes = vec![
            node(parent, None, "EUR", dec!(0)),
            node(food, Some(parent), "EUR", dec!(120.50)),
            node(fuel, Some(parent), "EUR", dec!(60.25)),
        ];

        let result = aggregate(&nodes, &policy(MixedCurrencyTarget::DefaultCurrency), &currency)
            .await
            .unwrap();

        let top = find(&result, parent);
        assert_eq!(top.currency_code, "EUR");
        assert_eq!(top.balance, dec!(180.75));
        assert!(top.child_balances.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_currency_uses_default_currency() {
        let rates = RateTable::with_common_currencies("USD").with_rate("EUR", "USD", dec!(1.10));
        let (parent, usd, eur) = (AccountId::new(), AccountId::new(), AccountId::new());
        let nodes = vec![
            node(parent, None, "EUR", dec!(10)),
            node(usd, Some(parent), "USD", dec!(50)),
            node(eur, Some(parent), "EUR", dec!(100)),
        ];

        let result = aggregate(&nodes, &policy(MixedCurrencyTarget::DefaultCurrency), &rates)
            .await
            .unwrap();

        let top = find(&result, parent);
        assert_eq!(top.currency_code, "USD");
        // 10 EUR + 100 EUR = 121 USD, plus 50 USD.
        assert_eq!(top.balance, dec!(171.00));
        assert_eq!(top.child_balances["EUR"], dec!(110));
        assert_eq!(top.child_balances["USD"], dec!(50));
        assert_eq!(find(&result, eur).currency_code, "EUR");
    }

    #[tokio::test]
    async fn test_mixed_currency_uses_parent_currency() {
        let rates = RateTable::with_common_currencies("USD").with_rate("EUR", "USD", dec!(1.25));
        let (parent, usd) = (AccountId::new(), AccountId::new());
        let nodes = vec![
            node(parent, None, "EUR", dec!(20)),
            node(usd, Some(parent), "USD", dec!(50)),
        ];

        let result = aggregate(&nodes, &policy(MixedCurrencyTarget::ParentCurrency), &rates)
            .await
            .unwrap();

        let top = find(&result, parent);
        assert_eq!(top.currency_code, "EUR");
        assert_eq!(top.balance, dec!(60.00));
    }

    #[tokio::test]
    async fn test_grandchildren_roll_up_through_parents() {
        let rates = RateTable::with_common_currencies("USD");
        let (root, mid, leaf) = (AccountId::new(), AccountId::new(), AccountId::new());
        let nodes = vec![
            node(root, None, "USD", dec!(1)),
            node(mid, Some(root), "USD", dec!(10)),
            node(leaf, Some(mid), "USD", dec!(100)),
        ];

        let result = aggregate(&nodes, &policy(MixedCurrencyTarget::DefaultCurrency), &rates)
            .await
            .unwrap();

        assert_eq!(find(&result, leaf).balance, dec!(100));
        assert_eq!(find(&result, mid).balance, dec!(110));
        assert_eq!(find(&result, root).balance, dec!(111));
        assert_eq!(find(&result, root).depth, 0);
        assert_eq!(find(&result, leaf).depth, 2);
    }

    #[tokio::test]
    async fn test_missing_rate_surfaces_error() {
        let rates = RateTable::with_common_currencies("USD");
        let (parent, child) = (AccountId::new(), AccountId::new());
        let nodes = vec![
            node(parent, None, "USD", dec!(0)),
            node(child, Some(parent), "GBP", dec!(5)),
        ];

        let result = aggregate(&nodes, &policy(MixedCurrencyTarget::DefaultCurrency), &rates).await;
        assert!(matches!(
            result,
            Err(LedgerError::Currency(CurrencyError::MissingRate { .. }))
        ));
    }
}

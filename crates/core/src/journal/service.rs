//! Journal service: the write path for journals.
//!
//! Every mutation follows the same pipeline:
//! 1. Resolve accounts and currency precisions
//! 2. Round each line to its account's precision and convert it into the
//!    journal currency
//! 3. Validate that debits equal credits
//! 4. Compute running balances incrementally where that is safe, and mark
//!    the remaining accounts for a ground-truth rebuild
//! 5. Write everything in one atomic batch
//! 6. Queue rebuilds, then record the audit entry
//!
//! Mutations are serialized so the "latest transaction" read in step 4
//! cannot race another writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_shared::types::{
    AccountId, JournalId, PageRequest, PageResponse, TransactionId, round_to_precision,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::projection::{EnrichedTransaction, JournalDetails};
use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::balance::BalanceService;
use crate::balance::running::append;
use crate::currency::CurrencyError;
use crate::ledger::reversal::{duplicate_lines, reversal_description, reversing_lines};
use crate::ledger::{
    Account, DisplayType, Journal, JournalInput, JournalLineInput, JournalStatus,
    JournalValidation, LedgerError, Transaction, is_backdated, validate_journal,
};
use crate::scheduler::RebuildScheduler;
use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::time::Clock;

/// Decimal digits kept on exchange rates derived from the currency service.
const DERIVED_RATE_SCALE: u32 = 10;

/// A journal header with its current lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalRecord {
    /// The journal header.
    pub journal: Journal,
    /// The journal's lines.
    pub transactions: Vec<Transaction>,
}

impl JournalRecord {
    fn write_ops(&self) -> impl Iterator<Item = WriteOp> + '_ {
        std::iter::once(WriteOp::PutJournal(self.journal.clone()))
            .chain(self.transactions.iter().cloned().map(WriteOp::PutTransaction))
    }

    fn account_ids(&self) -> BTreeSet<AccountId> {
        self.transactions.iter().map(|tx| tx.account_id).collect()
    }
}

struct ResolvedLine {
    input: JournalLineInput,
    account: Account,
    precision: u32,
    /// Rounded to the account's precision.
    amount: Decimal,
    /// In journal currency, rounded to the journal's precision.
    converted: Decimal,
    exchange_rate: Option<Decimal>,
}

struct ResolvedJournal {
    lines: Vec<ResolvedLine>,
    validation: JournalValidation,
}

/// Creates, edits, deletes, reverses, and reads journals.
pub struct JournalService {
    store: Arc<dyn RecordStore>,
    balances: Arc<BalanceService>,
    scheduler: RebuildScheduler,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JournalService {
    /// Creates a journal service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        balances: Arc<BalanceService>,
        scheduler: RebuildScheduler,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            balances,
            scheduler,
            audit,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Validates and posts a new journal.
    #[instrument(
        skip(self, input),
        fields(currency = %input.currency_code, lines = input.lines.len())
    )]
    pub async fn create_journal(&self, input: JournalInput) -> Result<JournalRecord, LedgerError> {
        let record = {
            let _write = self.write_lock.lock().await;
            let now = self.clock.now();
            let (record, dirty) = self.prepare(JournalId::new(), &input, now, now).await?;

            self.store.apply(record.write_ops().collect()).await?;
            self.scheduler.enqueue(dirty);
            record
        };

        info!(
            journal_id = %record.journal.id,
            status = record.journal.status.as_str(),
            display_type = record.journal.display_type.as_str(),
            total = %record.journal.total_amount,
            "Journal created"
        );
        self.audit
            .record(AuditEntry::journal(
                record.journal.id.into_inner(),
                AuditAction::Create,
                json!({ "after": snapshot(&record) }),
            ))
            .await;
        Ok(record)
    }

    /// Replaces a journal's header and lines, keeping its id.
    ///
    /// Every account touched before or after the edit is rebuilt.
    #[instrument(skip(self, input), fields(journal_id = %journal_id))]
    pub async fn update_journal(
        &self,
        journal_id: JournalId,
        input: JournalInput,
    ) -> Result<JournalRecord, LedgerError> {
        let (before, record) = {
            let _write = self.write_lock.lock().await;
            let existing = self.live_journal(journal_id).await?;
            if existing.status == JournalStatus::Reversed {
                return Err(LedgerError::JournalAlreadyReversed(journal_id));
            }
            let old_lines = self.store.journal_transactions(journal_id).await?;
            let now = self.clock.now();

            let (mut record, _) = self.prepare(journal_id, &input, existing.created_at, now).await?;
            record.journal.reversing_journal_id = existing.reversing_journal_id;

            let mut affected = BTreeSet::new();
            if existing.status.affects_balances() {
                affected.extend(old_lines.iter().map(|tx| tx.account_id));
            }
            if record.journal.status.affects_balances() {
                affected.extend(record.account_ids());
            }

            let mut batch = WriteBatch::new().with(WriteOp::SoftDeleteTransactions {
                journal_id,
                deleted_at: now,
            });
            batch.extend(record.write_ops());
            self.store.apply(batch).await?;
            self.scheduler.enqueue(affected);

            let before = JournalRecord {
                journal: existing,
                transactions: old_lines,
            };
            (before, record)
        };

        info!(journal_id = %journal_id, "Journal updated");
        self.audit
            .record(AuditEntry::journal(
                journal_id.into_inner(),
                AuditAction::Update,
                json!({ "before": snapshot(&before), "after": snapshot(&record) }),
            ))
            .await;
        Ok(record)
    }

    /// Soft-deletes a journal and its lines.
    #[instrument(skip(self), fields(journal_id = %journal_id))]
    pub async fn delete_journal(&self, journal_id: JournalId) -> Result<(), LedgerError> {
        let before = {
            let _write = self.write_lock.lock().await;
            let existing = self.live_journal(journal_id).await?;
            let lines = self.store.journal_transactions(journal_id).await?;

            let batch = WriteBatch::new().with(WriteOp::SoftDeleteJournal {
                journal_id,
                deleted_at: self.clock.now(),
            });
            self.store.apply(batch).await?;

            let before = JournalRecord {
                journal: existing,
                transactions: lines,
            };
            if before.journal.status.affects_balances() {
                self.scheduler.enqueue(before.account_ids());
            }
            before
        };

        info!(journal_id = %journal_id, "Journal deleted");
        self.audit
            .record(AuditEntry::journal(
                journal_id.into_inner(),
                AuditAction::Delete,
                json!({ "before": snapshot(&before) }),
            ))
            .await;
        Ok(())
    }

    /// Posts a journal that exactly offsets a posted journal, dated now.
    ///
    /// The original is marked `Reversed` in the same write.
    #[instrument(skip(self, reason), fields(journal_id = %journal_id))]
    pub async fn create_reversal_journal(
        &self,
        journal_id: JournalId,
        reason: &str,
    ) -> Result<JournalRecord, LedgerError> {
        let (original, reversed, record) = {
            let _write = self.write_lock.lock().await;
            let original = self.live_journal(journal_id).await?;
            match original.status {
                JournalStatus::Draft => return Err(LedgerError::CannotReverseDraft(journal_id)),
                JournalStatus::Reversed => {
                    return Err(LedgerError::JournalAlreadyReversed(journal_id));
                }
                JournalStatus::Posted => {}
            }

            let originals = self.store.journal_transactions(journal_id).await?;
            let now = self.clock.now();
            let input = JournalInput {
                journal_date: now,
                description: Some(reversal_description(original.description.as_deref(), reason)),
                currency_code: original.currency_code.clone(),
                status: JournalStatus::Posted,
                lines: reversing_lines(&originals),
            };
            let (record, dirty) = self.prepare(JournalId::new(), &input, now, now).await?;

            let mut reversed = original.clone();
            reversed.status = JournalStatus::Reversed;
            reversed.reversing_journal_id = Some(record.journal.id);
            reversed.updated_at = now;

            let mut batch: WriteBatch = record.write_ops().collect();
            batch.push(WriteOp::PutJournal(reversed.clone()));
            self.store.apply(batch).await?;
            self.scheduler.enqueue(dirty);
            (original, reversed, record)
        };

        info!(
            journal_id = %journal_id,
            reversing_journal_id = %record.journal.id,
            "Journal reversed"
        );
        self.audit
            .record(AuditEntry::journal(
                record.journal.id.into_inner(),
                AuditAction::Create,
                json!({ "after": snapshot(&record), "reverses": journal_id }),
            ))
            .await;
        self.audit
            .record(AuditEntry::journal(
                journal_id.into_inner(),
                AuditAction::Update,
                json!({ "before": snapshot(&original), "after": snapshot(&reversed) }),
            ))
            .await;
        Ok(record)
    }

    /// Re-submits a journal's lines as a new journal dated now.
    pub async fn duplicate_journal(
        &self,
        journal_id: JournalId,
    ) -> Result<JournalRecord, LedgerError> {
        let original = self.live_journal(journal_id).await?;
        let lines = self.store.journal_transactions(journal_id).await?;

        let input = JournalInput {
            journal_date: self.clock.now(),
            description: original.description.clone(),
            currency_code: original.currency_code.clone(),
            status: if original.status == JournalStatus::Draft {
                JournalStatus::Draft
            } else {
                JournalStatus::Posted
            },
            lines: duplicate_lines(&lines),
        };
        self.create_journal(input).await
    }

    /// A journal with its lines, enriched with account names.
    pub async fn journal_details(
        &self,
        journal_id: JournalId,
    ) -> Result<JournalDetails, LedgerError> {
        let journal = self.live_journal(journal_id).await?;
        let lines = self.store.journal_transactions(journal_id).await?;

        let ids: Vec<AccountId> = lines.iter().map(|tx| tx.account_id).collect();
        let accounts: HashMap<AccountId, Account> = self
            .store
            .find_accounts(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let lines = lines
            .into_iter()
            .map(|tx| {
                let account = accounts.get(&tx.account_id);
                EnrichedTransaction::new(tx, account, &journal)
            })
            .collect();
        Ok(JournalDetails { journal, lines })
    }

    /// One page of an account's lines, newest first, with journal context.
    pub async fn account_transactions(
        &self,
        account_id: AccountId,
        page: PageRequest,
    ) -> Result<PageResponse<EnrichedTransaction>, LedgerError> {
        let account = self
            .store
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let (lines, total) = self.store.account_transactions_page(account_id, page).await?;

        let mut journals: HashMap<JournalId, Journal> = HashMap::new();
        let mut data = Vec::with_capacity(lines.len());
        for tx in lines {
            if !journals.contains_key(&tx.journal_id) {
                let Some(journal) = self.store.find_journal(tx.journal_id).await? else {
                    continue;
                };
                journals.insert(journal.id, journal);
            }
            if let Some(journal) = journals.get(&tx.journal_id) {
                data.push(EnrichedTransaction::new(tx, Some(&account), journal));
            }
        }
        Ok(PageResponse::new(data, page, total))
    }

    async fn live_journal(&self, journal_id: JournalId) -> Result<Journal, LedgerError> {
        self.store
            .find_journal(journal_id)
            .await?
            .ok_or(LedgerError::JournalNotFound(journal_id))
    }

    /// Resolves, validates, and builds the records for a journal.
    ///
    /// Returns the records and the accounts that need a rebuild.
    async fn prepare(
        &self,
        journal_id: JournalId,
        input: &JournalInput,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(JournalRecord, BTreeSet<AccountId>), LedgerError> {
        let resolved = self.resolve(input).await?;
        let mut record = build_records(journal_id, input, &resolved, created_at, now);

        let dirty = if record.journal.status.affects_balances() {
            self.plan_balances(&mut record.transactions, &resolved).await?
        } else {
            BTreeSet::new()
        };
        Ok((record, dirty))
    }

    async fn resolve(&self, input: &JournalInput) -> Result<ResolvedJournal, LedgerError> {
        if input.lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        for line in &input.lines {
            if line.amount <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount {
                    account_id: line.account_id,
                    amount: line.amount,
                });
            }
            if let Some(rate) = line.exchange_rate.filter(|rate| *rate <= Decimal::ZERO) {
                return Err(LedgerError::InvalidExchangeRate {
                    account_id: line.account_id,
                    rate,
                });
            }
        }

        let journal_precision = self.balances.precision(&input.currency_code).await?;

        let ids: Vec<AccountId> = input
            .lines
            .iter()
            .map(|l| l.account_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let accounts: HashMap<AccountId, Account> = self
            .store
            .find_accounts(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let mut precisions: HashMap<String, u32> = HashMap::new();
        let mut lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let account = accounts
                .get(&line.account_id)
                .cloned()
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;

            let precision = match precisions.get(&account.currency_code) {
                Some(&p) => p,
                None => {
                    let p = self.balances.precision(&account.currency_code).await?;
                    precisions.insert(account.currency_code.clone(), p);
                    p
                }
            };

            let amount = round_to_precision(line.amount, precision);
            if amount <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount {
                    account_id: line.account_id,
                    amount: line.amount,
                });
            }

            let (converted, exchange_rate) = self
                .to_journal_currency(amount, &account.currency_code, input, line, journal_precision)
                .await?;

            lines.push(ResolvedLine {
                input: line.clone(),
                account,
                precision,
                amount,
                converted,
                exchange_rate,
            });
        }

        let validation = validate_journal(
            lines.iter().map(|l| (l.input.transaction_type, l.converted)),
            journal_precision,
        )
        .ok_or(LedgerError::TotalsOverflow)?;
        if !validation.is_valid {
            warn!(
                total_debits = %validation.total_debits,
                total_credits = %validation.total_credits,
                imbalance = %validation.imbalance,
                "Rejected unbalanced journal"
            );
            return Err(LedgerError::UnbalancedJournal {
                total_debits: validation.total_debits,
                total_credits: validation.total_credits,
                imbalance: validation.imbalance,
            });
        }

        Ok(ResolvedJournal { lines, validation })
    }

    async fn to_journal_currency(
        &self,
        amount: Decimal,
        account_currency: &str,
        input: &JournalInput,
        line: &JournalLineInput,
        journal_precision: u32,
    ) -> Result<(Decimal, Option<Decimal>), LedgerError> {
        if account_currency == input.currency_code {
            return Ok((amount, None));
        }
        let overflow = || LedgerError::InvalidAmount {
            account_id: line.account_id,
            amount: line.amount,
        };
        if let Some(rate) = line.exchange_rate {
            let converted = amount.checked_mul(rate).ok_or_else(overflow)?;
            return Ok((round_to_precision(converted, journal_precision), Some(rate)));
        }

        let converted = self
            .balances
            .currency()
            .convert(amount, account_currency, &input.currency_code)
            .await
            .map_err(|err| match err {
                CurrencyError::Overflow { .. } => overflow(),
                other => other.into(),
            })?;
        let rate = converted
            .checked_div(amount)
            .map(|r| r.round_dp(DERIVED_RATE_SCALE));
        Ok((round_to_precision(converted, journal_precision), rate))
    }

    /// Writes incremental running balances and returns the accounts to rebuild.
    ///
    /// Lines for an account that is backdated or already waiting on a
    /// rebuild still get a best-effort running balance, which the rebuild
    /// then overwrites.
    async fn plan_balances(
        &self,
        transactions: &mut [Transaction],
        resolved: &ResolvedJournal,
    ) -> Result<BTreeSet<AccountId>, LedgerError> {
        let accounts: HashMap<AccountId, (&Account, u32)> = resolved
            .lines
            .iter()
            .map(|l| (l.account.id, (&l.account, l.precision)))
            .collect();

        let mut by_account: BTreeMap<AccountId, Vec<&mut Transaction>> = BTreeMap::new();
        for tx in transactions.iter_mut() {
            by_account.entry(tx.account_id).or_default().push(tx);
        }

        let mut dirty = BTreeSet::new();
        for (account_id, mut lines) in by_account {
            let Some(&(account, precision)) = accounts.get(&account_id) else {
                return Err(LedgerError::AccountNotFound(account_id));
            };
            lines.sort_by_key(|tx| tx.chronological_key());

            let latest = self.store.latest_ledger_transaction(account_id).await?;
            let earliest_new = lines.first().map(|tx| tx.transaction_date);
            let latest_date = latest.as_ref().map(|t| t.transaction_date);
            let backdated = earliest_new.is_some_and(|date| is_backdated(date, latest_date));
            let pending = self.scheduler.is_pending(account_id);

            let previous = latest.map_or(Decimal::ZERO, |t| t.running_balance);
            let balance = append(previous, &mut lines, account.account_type, precision)
                .ok_or(LedgerError::BalanceOverflow(account_id))?;

            if backdated || pending {
                debug!(account_id = %account_id, backdated, pending, "Account marked for rebuild");
                dirty.insert(account_id);
            } else {
                debug!(
                    account_id = %account_id,
                    balance = %balance,
                    "Running balance updated incrementally"
                );
            }
        }
        Ok(dirty)
    }
}

fn build_records(
    journal_id: JournalId,
    input: &JournalInput,
    resolved: &ResolvedJournal,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> JournalRecord {
    let transactions: Vec<Transaction> = resolved
        .lines
        .iter()
        .map(|line| Transaction {
            id: TransactionId::new(),
            journal_id,
            account_id: line.account.id,
            amount: line.amount,
            transaction_type: line.input.transaction_type,
            currency_code: line.account.currency_code.clone(),
            transaction_date: input.journal_date,
            notes: line.input.notes.clone(),
            exchange_rate: line.exchange_rate,
            running_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .collect();

    let journal = Journal {
        id: journal_id,
        journal_date: input.journal_date,
        description: input.description.clone(),
        currency_code: input.currency_code.clone(),
        status: input.status,
        total_amount: resolved.validation.total_amount(),
        transaction_count: u32::try_from(transactions.len()).unwrap_or(u32::MAX),
        display_type: DisplayType::classify(resolved.lines.iter().map(|l| l.account.account_type)),
        reversing_journal_id: None,
        created_at,
        updated_at: now,
        deleted_at: None,
    };

    JournalRecord {
        journal,
        transactions,
    }
}

fn snapshot(value: &impl Serialize) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

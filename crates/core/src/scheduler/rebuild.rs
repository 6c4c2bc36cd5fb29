use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use folio_shared::RebuildSettings;
use folio_shared::types::AccountId;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{AccountRebuildState, AccountRebuilder, RebuildFailure, RebuildOutcome};
use crate::time::Timer;

/// Snapshot of the scheduler's queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    /// Accounts waiting for a batch.
    pub queued: usize,
    /// Accounts being rebuilt.
    pub processing: usize,
    /// Whether a debounce timer is running.
    pub armed: bool,
}

impl SchedulerStatus {
    /// Returns true when nothing is queued, running, or scheduled.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.processing == 0 && !self.armed
    }
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<AccountId>,
    queued: HashSet<AccountId>,
    processing: HashSet<AccountId>,
    generation: u64,
    debounce: Option<JoinHandle<()>>,
    draining: bool,
}

struct Inner {
    rebuilder: Arc<dyn AccountRebuilder>,
    timer: Arc<dyn Timer>,
    settings: RebuildSettings,
    state: Mutex<QueueState>,
    drain_lock: AsyncMutex<()>,
    status: watch::Sender<SchedulerStatus>,
}

/// Debounced, batched scheduler for ground-truth account rebuilds.
///
/// - Enqueue is idempotent per account while it waits.
/// - Each new account restarts the debounce timer.
/// - Batches hold at most `max_batch_size` accounts. Rounds repeat until
///   the queue is empty.
/// - Only one drain runs at a time.
/// - A failed rebuild is logged and reported; it never stops the batch.
///
/// Enqueueing spawns the debounce timer, so it must run inside a Tokio runtime.
#[derive(Clone)]
pub struct RebuildScheduler {
    inner: Arc<Inner>,
}

impl RebuildScheduler {
    /// Creates a scheduler that rebuilds through `rebuilder`.
    #[must_use]
    pub fn new(
        rebuilder: Arc<dyn AccountRebuilder>,
        timer: Arc<dyn Timer>,
        settings: RebuildSettings,
    ) -> Self {
        let (status, _) = watch::channel(SchedulerStatus::default());
        Self {
            inner: Arc::new(Inner {
                rebuilder,
                timer,
                settings,
                state: Mutex::new(QueueState::default()),
                drain_lock: AsyncMutex::new(()),
                status,
            }),
        }
    }

    /// Queues accounts for rebuild and restarts the debounce timer.
    pub fn enqueue(&self, account_ids: impl IntoIterator<Item = AccountId>) {
        let mut state = self.inner.lock();
        let mut added = 0usize;
        for id in account_ids {
            if state.queued.insert(id) {
                state.queue.push_back(id);
                added += 1;
            }
        }
        if added == 0 {
            return;
        }

        debug!(added, queued = state.queue.len(), "Accounts queued for rebuild");
        // A running drain picks up new ids itself.
        if !state.draining {
            self.inner.arm(&mut state);
        }
        self.inner.publish(&state);
    }

    /// Cancels the timer and rebuilds every queued account now.
    pub async fn flush(&self) -> RebuildOutcome {
        {
            let mut state = self.inner.lock();
            self.inner.disarm(&mut state);
            self.inner.publish(&state);
        }

        // Run on its own task so dropping this future never abandons a batch.
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.drain().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Rebuild drain task failed");
                RebuildOutcome::default()
            }
        }
    }

    /// Drops every queued account and cancels the timer.
    ///
    /// Accounts already being rebuilt finish normally.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        self.inner.disarm(&mut state);
        let dropped = state.queue.len();
        state.queue.clear();
        state.queued.clear();
        self.inner.publish(&state);
        if dropped > 0 {
            warn!(dropped, "Rebuild queue cleared");
        }
    }

    /// Returns an account's position in the rebuild pipeline.
    #[must_use]
    pub fn state(&self, account_id: AccountId) -> AccountRebuildState {
        let state = self.inner.lock();
        if state.queued.contains(&account_id) {
            AccountRebuildState::Queued
        } else if state.processing.contains(&account_id) {
            AccountRebuildState::Processing
        } else {
            AccountRebuildState::Clean
        }
    }

    /// Returns true if the account is queued or being rebuilt.
    #[must_use]
    pub fn is_pending(&self, account_id: AccountId) -> bool {
        self.state(account_id) != AccountRebuildState::Clean
    }

    /// Number of distinct accounts queued or being rebuilt.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let state = self.inner.lock();
        state.queued.len() + state.processing.difference(&state.queued).count()
    }

    /// Returns true if any account is queued or being rebuilt.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Current queue snapshot.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        *self.inner.status.borrow()
    }

    /// Waits until nothing is queued, running, or scheduled.
    pub async fn settled(&self) {
        let mut status = self.inner.status.subscribe();
        let _ = status.wait_for(SchedulerStatus::is_idle).await;
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &QueueState) {
        self.status.send_replace(SchedulerStatus {
            queued: state.queue.len(),
            processing: state.processing.len(),
            armed: state.debounce.is_some(),
        });
    }

    fn disarm(&self, state: &mut QueueState) {
        state.generation += 1;
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
    }

    fn arm(self: &Arc<Self>, state: &mut QueueState) {
        self.disarm(state);
        let generation = state.generation;
        // Created here so the deadline is measured from the enqueue.
        let sleep = self.timer.sleep(self.settings.debounce());
        let inner = Arc::clone(self);
        state.debounce = Some(tokio::spawn(async move {
            sleep.await;
            inner.debounce_elapsed(generation).await;
        }));
    }

    async fn debounce_elapsed(&self, generation: u64) {
        {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.debounce = None;
            self.publish(&state);
        }
        let outcome = self.drain().await;
        if !outcome.is_success() {
            warn!(
                failed = outcome.failed.len(),
                rebuilt = outcome.rebuilt.len(),
                "Background rebuild finished with failures"
            );
        }
    }

    async fn drain(&self) -> RebuildOutcome {
        let _drain = self.drain_lock.lock().await;
        let batch_size = self.settings.max_batch_size.max(1);
        let mut outcome = RebuildOutcome::default();

        loop {
            let batch: Vec<AccountId> = {
                let mut state = self.lock();
                let take = batch_size.min(state.queue.len());
                let batch: Vec<AccountId> = state.queue.drain(..take).collect();
                for id in &batch {
                    state.queued.remove(id);
                    state.processing.insert(*id);
                }
                state.draining = !batch.is_empty();
                self.publish(&state);
                batch
            };
            if batch.is_empty() {
                break;
            }

            let round = self.run_round(&batch).await;

            {
                let mut state = self.lock();
                for id in &batch {
                    state.processing.remove(id);
                }
                self.publish(&state);
            }
            outcome.absorb(round);
        }

        if outcome.attempted() > 0 {
            info!(
                rebuilt = outcome.rebuilt.len(),
                failed = outcome.failed.len(),
                "Rebuild queue drained"
            );
        }
        outcome
    }

    async fn run_round(&self, batch: &[AccountId]) -> RebuildOutcome {
        debug!(accounts = batch.len(), "Rebuilding account batch");
        let results = join_all(batch.iter().map(|&account_id| async move {
            (account_id, self.rebuilder.rebuild_account(account_id).await)
        }))
        .await;

        let mut outcome = RebuildOutcome::default();
        for (account_id, result) in results {
            match result {
                Ok(report) => outcome.rebuilt.push(report),
                Err(e) => {
                    error!(
                        account_id = %account_id,
                        error = %e,
                        code = e.error_code(),
                        "Account rebuild failed"
                    );
                    outcome.failed.push(RebuildFailure {
                        account_id,
                        error: e,
                    });
                }
            }
        }
        outcome
    }
}

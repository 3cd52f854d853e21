use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use log::{error, info, warn};
use tokio::sync::{watch, Semaphore};
use tracing::instrument;

use daysign_domain::account::{Account, AccountRepository};
use daysign_domain::checkin::{
    CheckinClient, Outcome, ResultLogRepository, ResultRecord, RetryDecision, RetryPolicy,
};
use daysign_domain::game::{Game, GameDescriptor};
use daysign_domain::shared::{AccountId, DomainError};

/// One (account, game) pair due for execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuePair {
    pub account_id: AccountId,
    pub game: Game,
}

/// Summary of one `run_due` batch.
#[derive(Debug)]
pub struct BatchRunResult {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub records: Vec<ResultRecord>,
    /// Pairs whose record could not be persisted, with the error. The
    /// scheduler must not advance these accounts; the pairs stay due and
    /// retry on the next tick.
    pub storage_failures: Vec<(DuePair, String)>,
}

/// Executes due pairs with bounded concurrency, applying the retry policy
/// per pair. Pairs are fully isolated: one pair's failure never affects
/// another's execution or result.
pub struct RunCoordinator {
    client: Arc<dyn CheckinClient>,
    account_repo: Arc<dyn AccountRepository>,
    result_log: Arc<dyn ResultLogRepository>,
    descriptors: Arc<HashMap<Game, GameDescriptor>>,
    policy: RetryPolicy,
    pool: Arc<Semaphore>,
}

impl RunCoordinator {
    pub fn new(
        client: Arc<dyn CheckinClient>,
        account_repo: Arc<dyn AccountRepository>,
        result_log: Arc<dyn ResultLogRepository>,
        descriptors: HashMap<Game, GameDescriptor>,
        policy: RetryPolicy,
        worker_pool_size: usize,
    ) -> Self {
        Self {
            client,
            account_repo,
            result_log,
            descriptors: Arc::new(descriptors),
            policy,
            pool: Arc::new(Semaphore::new(worker_pool_size.max(1))),
        }
    }

    /// Run every due pair to a terminal outcome for `date`.
    ///
    /// `cancel` flips to true when the user stops the run: in-flight
    /// attempts finish their current network call, further retries are
    /// suppressed and the affected pairs are recorded as `Cancelled`.
    #[instrument(skip(self, pairs, cancel), fields(batch_size = pairs.len()))]
    pub async fn run_due(
        &self,
        pairs: Vec<DuePair>,
        date: NaiveDate,
        cancel: watch::Receiver<bool>,
    ) -> Result<BatchRunResult, DomainError> {
        let total = pairs.len();
        info!("Running batch of {} due pair(s) for {}", total, date);

        // Batch load all accounts once to avoid N+1 queries.
        let accounts: HashMap<String, Account> = self
            .account_repo
            .find_all()
            .await?
            .into_iter()
            .map(|account| (account.id().as_str().to_string(), account))
            .collect();

        let mut tasks = Vec::with_capacity(total);
        for pair in pairs {
            let Some(account) = accounts.get(pair.account_id.as_str()).cloned() else {
                warn!("Account {} not found, skipping pair", pair.account_id);
                continue;
            };
            let Some(descriptor) = self.descriptors.get(&pair.game).cloned() else {
                warn!("No descriptor for game {}, skipping pair", pair.game);
                continue;
            };

            let client = Arc::clone(&self.client);
            let account_repo = Arc::clone(&self.account_repo);
            let result_log = Arc::clone(&self.result_log);
            let policy = self.policy.clone();
            let pool = Arc::clone(&self.pool);
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                // Queue behind the worker pool; closed only on shutdown.
                let _permit = match pool.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return Err("worker pool closed".to_string()),
                };

                let record = run_pair(
                    client.as_ref(),
                    account_repo.as_ref(),
                    &policy,
                    account,
                    &descriptor,
                    date,
                    cancel,
                )
                .await;

                match result_log.upsert(&record).await {
                    Ok(()) => Ok(record),
                    Err(e) => {
                        error!(
                            "Failed to persist record for {} / {}: {}",
                            record.account_id, record.game, e
                        );
                        Err(e.to_string())
                    }
                }
            });
            tasks.push((pair, handle));
        }

        let (run_pairs, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();

        let mut records = Vec::new();
        let mut storage_failures = Vec::new();
        for (pair, joined) in run_pairs.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(e)) => storage_failures.push((pair, e)),
                Err(e) => storage_failures.push((pair, format!("worker panicked: {}", e))),
            }
        }

        let success_count = records
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    daysign_domain::checkin::RecordStatus::Success
                        | daysign_domain::checkin::RecordStatus::AlreadyDone
                )
            })
            .count();
        let failed_count = records.len() - success_count;

        info!(
            "Batch done: {} record(s), {} ok, {} failed, {} storage failure(s)",
            records.len(),
            success_count,
            failed_count,
            storage_failures.len()
        );

        Ok(BatchRunResult {
            total,
            success_count,
            failed_count,
            records,
            storage_failures,
        })
    }
}

/// Drive one pair to a terminal outcome: attempt, decide, back off,
/// repeat. Suspends only this worker during backoff.
async fn run_pair(
    client: &dyn CheckinClient,
    account_repo: &dyn AccountRepository,
    policy: &RetryPolicy,
    account: Account,
    descriptor: &GameDescriptor,
    date: NaiveDate,
    mut cancel: watch::Receiver<bool>,
) -> ResultRecord {
    let account_id = account.id().clone();
    let game = descriptor.game();

    // A session already marked invalid is skipped entirely: recorded as
    // InvalidCredential with zero network calls, until the auth
    // collaborator refreshes it.
    if !account.has_usable_session(Utc::now()) {
        info!(
            "[{}] Session unusable, skipping {} without a network call",
            account.name(),
            game
        );
        return ResultRecord::from_outcome(account_id, game, date, &Outcome::InvalidCredential, 0);
    }

    let mut attempt: u32 = 1;
    loop {
        if *cancel.borrow() {
            return ResultRecord::cancelled(account_id, game, date, attempt - 1);
        }

        // The network call itself is never aborted mid-request.
        let outcome = client.attempt(&account, descriptor).await;

        match policy.decide(&outcome, attempt) {
            RetryDecision::Terminal(outcome) => {
                if outcome == Outcome::InvalidCredential {
                    mark_session_invalid(account_repo, &account).await;
                }
                return ResultRecord::from_outcome(account_id, game, date, &outcome, attempt);
            }
            RetryDecision::RetryAfter(delay) => {
                info!(
                    "[{}] {} attempt {} -> {}, retrying in {:?}",
                    account.name(),
                    game,
                    attempt,
                    outcome.label(),
                    delay
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() {
                            return ResultRecord::cancelled(account_id, game, date, attempt);
                        }
                    }
                }
                attempt += 1;
            }
        }
    }
}

async fn mark_session_invalid(account_repo: &dyn AccountRepository, account: &Account) {
    let mut updated = account.clone();
    updated.invalidate_session();
    if let Err(e) = account_repo.save(&updated).await {
        error!(
            "Failed to flag invalid session for {}: {}",
            account.id(),
            e
        );
    }
}

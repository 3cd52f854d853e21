use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::instrument;

use daysign_domain::account::AccountRepository;
use daysign_domain::checkin::ResultLogRepository;
use daysign_domain::schedule::{ScheduleEntry, ScheduleRepository};
use daysign_domain::shared::{AccountId, DomainError};

use crate::coordinator::{BatchRunResult, DuePair, RunCoordinator};
use crate::events::EngineEvent;

/// Drives the per-account daily state machine: a single periodic tick
/// scans all schedule entries, batches due pairs into the coordinator and
/// advances each account's next-due only after a terminal outcome.
///
/// The tick never runs concurrently with itself; a tick that fires while
/// the previous batch is still executing is coalesced away.
pub struct Scheduler {
    account_repo: Arc<dyn AccountRepository>,
    schedule_repo: Arc<dyn ScheduleRepository>,
    result_log: Arc<dyn ResultLogRepository>,
    coordinator: Arc<RunCoordinator>,
    events: broadcast::Sender<EngineEvent>,
    cancel_tx: watch::Sender<bool>,
    tick_guard: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        schedule_repo: Arc<dyn ScheduleRepository>,
        result_log: Arc<dyn ResultLogRepository>,
        coordinator: Arc<RunCoordinator>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            account_repo,
            schedule_repo,
            result_log,
            coordinator,
            events,
            cancel_tx,
            tick_guard: Mutex::new(()),
        }
    }

    /// Spawn the periodic driver. The first tick runs immediately, which
    /// doubles as the startup reconciliation: any account whose configured
    /// time already passed today (or on a missed day) becomes due exactly
    /// once.
    pub fn spawn_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = scheduler.tick().await {
                    error!("Scheduling tick failed: {}", e);
                    let _ = scheduler.events.send(EngineEvent::TickFailed {
                        error: e.to_string(),
                    });
                }
            }
        })
    }

    /// One scan: collect due pairs, hand them to the coordinator, advance
    /// completed schedules. Stateless entry point; also callable from an
    /// external cron-like trigger.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), DomainError> {
        // Coalesce reentrant ticks while a batch is still executing.
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("Previous tick still running, coalescing");
            return Ok(());
        };

        let now = Local::now().naive_local();
        let pairs = self.collect_due_pairs(now).await?;
        if pairs.is_empty() {
            return Ok(());
        }

        info!(
            "{} due pair(s) at {}",
            pairs.len(),
            now.format("%Y-%m-%d %H:%M")
        );
        self.execute(pairs, now.date()).await
    }

    /// Manual run: bypasses the time check but still respects the
    /// coordinator's invalid-session skip and the one-record-per-day
    /// overwrite rule.
    #[instrument(skip(self))]
    pub async fn run_now(&self, account_ids: Option<Vec<AccountId>>) -> Result<(), DomainError> {
        let _guard = self.tick_guard.lock().await;

        let filter: Option<HashSet<String>> = account_ids
            .map(|ids| ids.iter().map(|id| id.as_str().to_string()).collect());

        let mut pairs = Vec::new();
        for account in self.account_repo.find_enabled().await? {
            if let Some(filter) = &filter {
                if !filter.contains(account.id().as_str()) {
                    continue;
                }
            }
            for game in account.games() {
                pairs.push(DuePair {
                    account_id: account.id().clone(),
                    game,
                });
            }
        }

        if pairs.is_empty() {
            warn!("Manual run requested but no matching enabled accounts");
            return Ok(());
        }

        info!("Manual run for {} pair(s)", pairs.len());
        self.execute(pairs, Local::now().date_naive()).await
    }

    /// Stop the current batch: in-flight attempts finish their network
    /// call, pending retries are marked Cancelled.
    pub fn cancel_run(&self) {
        info!("Cancelling in-flight run");
        let _ = self.cancel_tx.send(true);
    }

    async fn execute(&self, pairs: Vec<DuePair>, date: NaiveDate) -> Result<(), DomainError> {
        // Re-arm cancellation for this batch.
        let _ = self.cancel_tx.send(false);

        let result = self
            .coordinator
            .run_due(pairs, date, self.cancel_tx.subscribe())
            .await?;

        self.advance_schedules(&result, date).await?;

        for record in &result.records {
            let _ = self.events.send(EngineEvent::RecordWritten(record.clone()));
        }
        if !result.storage_failures.is_empty() {
            let error = result
                .storage_failures
                .iter()
                .map(|(pair, e)| format!("{}/{}: {}", pair.account_id, pair.game, e))
                .collect::<Vec<_>>()
                .join("; ");
            let _ = self.events.send(EngineEvent::TickFailed { error });
        }

        Ok(())
    }

    /// Scan all enabled accounts: an account past its configured time with
    /// games not yet terminally recorded today contributes those games as
    /// due pairs. Accounts without a schedule entry get the default slot.
    async fn collect_due_pairs(&self, now: NaiveDateTime) -> Result<Vec<DuePair>, DomainError> {
        let accounts = self.account_repo.find_enabled().await?;
        if accounts.is_empty() {
            return Ok(Vec::new());
        }

        let entries: HashMap<String, ScheduleEntry> = self
            .schedule_repo
            .find_all()
            .await?
            .into_iter()
            .map(|entry| (entry.account_id().as_str().to_string(), entry))
            .collect();

        let today = now.date();
        let mut pairs = Vec::new();

        for account in accounts {
            let entry = match entries.get(account.id().as_str()) {
                Some(entry) => entry.clone(),
                None => {
                    // First sight of this account: persist a default slot.
                    let entry = ScheduleEntry::new(account.id().clone(), default_time());
                    self.schedule_repo.save(&entry).await?;
                    entry
                }
            };

            if !entry.is_due(now) {
                continue;
            }

            for game in account.games() {
                let done = self
                    .result_log
                    .find(account.id(), game, today)
                    .await?
                    .is_some_and(|record| record.status.completes_day());
                if !done {
                    pairs.push(DuePair {
                        account_id: account.id().clone(),
                        game,
                    });
                }
            }
        }

        Ok(pairs)
    }

    /// Advance next-due for accounts whose every game reached a
    /// day-completing outcome that was also persisted. Cancelled pairs
    /// and storage-failed pairs leave the account due, so the next tick
    /// picks them up again.
    async fn advance_schedules(
        &self,
        result: &BatchRunResult,
        date: NaiveDate,
    ) -> Result<(), DomainError> {
        let unpersisted: HashSet<&str> = result
            .storage_failures
            .iter()
            .map(|(pair, _)| pair.account_id.as_str())
            .collect();

        let mut by_account: HashMap<String, (AccountId, bool)> = HashMap::new();
        for record in &result.records {
            let slot = by_account
                .entry(record.account_id.as_str().to_string())
                .or_insert_with(|| (record.account_id.clone(), true));
            slot.1 &= record.status.completes_day();
        }

        for (account_id, all_completed) in by_account.into_values() {
            if !all_completed || unpersisted.contains(account_id.as_str()) {
                debug!(
                    "Account {} has cancelled or unpersisted pairs, staying due",
                    account_id
                );
                continue;
            }
            if let Some(mut entry) = self.schedule_repo.find_by_account_id(&account_id).await? {
                entry.mark_completed(date);
                self.schedule_repo.save(&entry).await?;
                let _ = self
                    .events
                    .send(EngineEvent::ScheduleUpdated { account_id });
            }
        }

        Ok(())
    }
}

fn default_time() -> NaiveTime {
    let (hour, minute) = ScheduleEntry::DEFAULT_TIME_OF_DAY;
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

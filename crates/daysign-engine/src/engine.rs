use std::sync::Arc;

use chrono::{DateTime, Days, Local, NaiveTime, Utc};
use log::info;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use daysign_domain::account::{Account, AccountRepository, SessionToken};
use daysign_domain::checkin::{ResultLogRepository, ResultRecord};
use daysign_domain::game::{builtin_descriptors, Game};
use daysign_domain::schedule::{ScheduleEntry, ScheduleRepository};
use daysign_domain::shared::{AccountId, DomainError};

use daysign_infrastructure::config::EngineConfig;

use crate::coordinator::RunCoordinator;
use crate::events::EngineEvent;
use crate::scheduler::Scheduler;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The engine facade: owns the repositories, coordinator and scheduler and
/// exposes the narrow API the auth and UI collaborators talk to.
pub struct Engine {
    config: EngineConfig,
    account_repo: Arc<dyn AccountRepository>,
    schedule_repo: Arc<dyn ScheduleRepository>,
    result_log: Arc<dyn ResultLogRepository>,
    scheduler: Arc<Scheduler>,
    events: broadcast::Sender<EngineEvent>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn daysign_domain::checkin::CheckinClient>,
        account_repo: Arc<dyn AccountRepository>,
        schedule_repo: Arc<dyn ScheduleRepository>,
        result_log: Arc<dyn ResultLogRepository>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let coordinator = Arc::new(RunCoordinator::new(
            client,
            Arc::clone(&account_repo),
            Arc::clone(&result_log),
            builtin_descriptors(),
            config.retry_policy(),
            config.worker_pool_size,
        ));

        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&account_repo),
            Arc::clone(&schedule_repo),
            Arc::clone(&result_log),
            coordinator,
            events.clone(),
        ));

        Self {
            config,
            account_repo,
            schedule_repo,
            result_log,
            scheduler,
            events,
            loop_handle: Mutex::new(None),
        }
    }

    /// Start the periodic driver. The first tick doubles as startup
    /// reconciliation (single catch-up per account, never a backlog).
    pub async fn start(&self) {
        let mut handle = self.loop_handle.lock().await;
        if handle.is_some() {
            return;
        }
        *handle = Some(self.scheduler.spawn_loop(self.config.tick_interval));
        info!(
            "Engine started, tick every {:?}",
            self.config.tick_interval
        );
    }

    pub async fn shutdown(&self) {
        self.scheduler.cancel_run();
        let mut handle = self.loop_handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.abort();
        }
        info!("Engine stopped");
    }

    // ========== Inbound from the UI collaborator ==========

    pub async fn add_account(
        &self,
        id: AccountId,
        name: String,
        token: String,
        token_expires_at: Option<DateTime<Utc>>,
        games: Vec<Game>,
        time_of_day: NaiveTime,
    ) -> Result<(), DomainError> {
        let account = Account::new(
            id.clone(),
            name,
            SessionToken::new(token, token_expires_at),
            games,
        )?;
        self.account_repo.save(&account).await?;
        self.schedule_repo
            .save(&ScheduleEntry::new(id.clone(), time_of_day))
            .await?;

        info!("Account {} added", id);
        let _ = self
            .events
            .send(EngineEvent::ScheduleUpdated { account_id: id });
        Ok(())
    }

    pub async fn remove_account(&self, id: &AccountId) -> Result<(), DomainError> {
        self.schedule_repo.delete(id).await?;
        self.account_repo.delete(id).await?;
        info!("Account {} removed", id);
        Ok(())
    }

    pub async fn set_enabled(&self, id: &AccountId, enabled: bool) -> Result<(), DomainError> {
        let mut account = self.require_account(id).await?;
        account.set_enabled(enabled);
        self.account_repo.save(&account).await
    }

    pub async fn set_schedule(
        &self,
        id: &AccountId,
        hour: u32,
        minute: u32,
    ) -> Result<(), DomainError> {
        let mut entry = match self.schedule_repo.find_by_account_id(id).await? {
            Some(entry) => entry,
            None => {
                // Account exists but was never scheduled; start fresh.
                self.require_account(id).await?;
                ScheduleEntry::new(
                    id.clone(),
                    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
                )
            }
        };
        entry.set_time_of_day(hour, minute)?;
        self.schedule_repo.save(&entry).await?;

        let _ = self.events.send(EngineEvent::ScheduleUpdated {
            account_id: id.clone(),
        });
        Ok(())
    }

    /// Manual trigger; `None` runs every enabled account.
    pub async fn run_now(&self, account_ids: Option<Vec<AccountId>>) -> Result<(), DomainError> {
        self.scheduler.run_now(account_ids).await
    }

    /// Stateless "run due schedules" entry point. The periodic loop calls
    /// this; an external cron-like trigger can call it too.
    pub async fn tick(&self) -> Result<(), DomainError> {
        self.scheduler.tick().await
    }

    pub fn cancel_run(&self) {
        self.scheduler.cancel_run();
    }

    /// Push feed of result and schedule changes.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ========== Inbound from the auth collaborator ==========

    /// Accepts a fresh session at any time, including mid-run; the next
    /// run uses the new token.
    pub async fn update_session(
        &self,
        id: &AccountId,
        token: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let mut account = self.require_account(id).await?;
        account.update_session(token, expires_at)?;
        self.account_repo.save(&account).await?;
        info!("Session refreshed for account {}", id);
        Ok(())
    }

    // ========== Pull queries for the UI collaborator ==========

    pub async fn accounts(&self) -> Result<Vec<Account>, DomainError> {
        self.account_repo.find_all().await
    }

    pub async fn schedule_entries(&self) -> Result<Vec<ScheduleEntry>, DomainError> {
        self.schedule_repo.find_all().await
    }

    pub async fn recent_results(&self, limit: u32) -> Result<Vec<ResultRecord>, DomainError> {
        self.result_log.recent(limit).await
    }

    /// Retention: drops result records older than `keep_days` days,
    /// returning how many were removed. Today's records always survive.
    pub async fn prune_results(&self, keep_days: u64) -> Result<u64, DomainError> {
        let Some(cutoff) = Local::now()
            .date_naive()
            .checked_sub_days(Days::new(keep_days))
        else {
            return Ok(0);
        };
        let pruned = self.result_log.prune_before(cutoff).await?;
        if pruned > 0 {
            info!("Pruned {} result record(s) older than {}", pruned, cutoff);
        }
        Ok(pruned)
    }

    async fn require_account(&self, id: &AccountId) -> Result<Account, DomainError> {
        self.account_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id.to_string()))
    }
}

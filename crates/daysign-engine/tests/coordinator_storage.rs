use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use mockall::mock;
use tokio::sync::watch;

use daysign_domain::account::AccountRepository;
use daysign_domain::checkin::{Outcome, ResultLogRepository, ResultRecord, RetryPolicy};
use daysign_domain::game::{builtin_descriptors, Game};
use daysign_domain::shared::{AccountId, DomainError};
use daysign_engine::{DuePair, RunCoordinator};

use test_helpers::{account, in_memory_repos, ScriptedClient};

mock! {
    pub ResultLog {}

    #[async_trait]
    impl ResultLogRepository for ResultLog {
        async fn upsert(&self, record: &ResultRecord) -> Result<(), DomainError>;
        async fn find(
            &self,
            account_id: &AccountId,
            game: Game,
            date: NaiveDate,
        ) -> Result<Option<ResultRecord>, DomainError>;
        async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ResultRecord>, DomainError>;
        async fn recent(&self, limit: u32) -> Result<Vec<ResultRecord>, DomainError>;
        async fn prune_before(&self, date: NaiveDate) -> Result<u64, DomainError>;
    }
}

#[tokio::test]
async fn failed_persistence_is_surfaced_not_swallowed() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(
        account.id(),
        Game::Genshin,
        vec![Outcome::Success { reward: None }],
    );

    let mut result_log = MockResultLog::new();
    result_log
        .expect_upsert()
        .times(1)
        .returning(|_| Err(DomainError::Repository("database is locked".to_string())));

    let coordinator = RunCoordinator::new(
        client,
        Arc::clone(&repos.accounts),
        Arc::new(result_log),
        builtin_descriptors(),
        RetryPolicy::default(),
        4,
    );

    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(
            vec![DuePair {
                account_id: account.id().clone(),
                game: Game::Genshin,
            }],
            Local::now().date_naive(),
            cancel,
        )
        .await
        .expect("Run batch");

    // The attempt ran, the write failed, and the failure is reported with
    // its pair so the scheduler leaves that account due for the next tick.
    assert!(result.records.is_empty());
    assert_eq!(result.storage_failures.len(), 1);
    let (pair, error) = &result.storage_failures[0];
    assert_eq!(pair.account_id, *account.id());
    assert_eq!(pair.game, Game::Genshin);
    assert!(error.contains("database is locked"));
}

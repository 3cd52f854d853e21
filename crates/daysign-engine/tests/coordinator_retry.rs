use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::watch;

use daysign_domain::account::AccountRepository;
use daysign_domain::checkin::{Outcome, RecordStatus, ResultLogRepository, RetryPolicy};
use daysign_domain::game::{builtin_descriptors, Game};
use daysign_engine::{DuePair, RunCoordinator};

use test_helpers::{account, in_memory_repos, Repos, ScriptedClient};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        Duration::from_millis(5),
        Duration::from_millis(20),
        max_attempts,
    )
}

fn coordinator(
    client: Arc<ScriptedClient>,
    repos: &Repos,
    policy: RetryPolicy,
) -> Arc<RunCoordinator> {
    Arc::new(RunCoordinator::new(
        client,
        Arc::clone(&repos.accounts),
        Arc::clone(&repos.results),
        builtin_descriptors(),
        policy,
        4,
    ))
}

fn transient() -> Outcome {
    Outcome::TransientError {
        detail: "connect timeout".to_string(),
    }
}

fn pair(account: &daysign_domain::account::Account, game: Game) -> DuePair {
    DuePair {
        account_id: account.id().clone(),
        game,
    }
}

#[tokio::test]
async fn transient_failures_then_success_yield_one_success_record() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    let coordinator = coordinator(Arc::clone(&client), &repos, fast_policy(3));

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(
        account.id(),
        Game::Genshin,
        vec![
            transient(),
            transient(),
            Outcome::Success {
                reward: Some("Primogem x20".to_string()),
            },
        ],
    );

    let today = Local::now().date_naive();
    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(vec![pair(&account, Game::Genshin)], today, cancel)
        .await
        .expect("Run batch");

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.success_count, 1);
    let record = &result.records[0];
    assert_eq!(record.status, RecordStatus::Success);
    assert_eq!(record.attempts, 3);
    assert_eq!(record.reward.as_deref(), Some("Primogem x20"));
    assert_eq!(client.calls(), 3);

    // The terminal record landed in the log under today's key.
    let stored = repos
        .results
        .find(account.id(), Game::Genshin, today)
        .await
        .expect("Find record")
        .expect("Record should be stored");
    assert_eq!(stored.status, RecordStatus::Success);
}

#[tokio::test]
async fn exhausted_transient_errors_record_failed_after_max_attempts() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    let coordinator = coordinator(Arc::clone(&client), &repos, fast_policy(3));

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(
        account.id(),
        Game::Genshin,
        vec![transient(), transient(), transient(), transient()],
    );

    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(
            vec![pair(&account, Game::Genshin)],
            Local::now().date_naive(),
            cancel,
        )
        .await
        .expect("Run batch");

    let record = &result.records[0];
    assert_eq!(record.status, RecordStatus::Failed);
    assert_eq!(record.attempts, 3);
    // Exactly max_attempts network calls, not one more.
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn rate_limit_hint_longer_than_backoff_is_honored() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    // Backoff after the first attempt would be 2s; the server hint is 120s
    // and must win.
    let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(60), 3);
    let coordinator = coordinator(Arc::clone(&client), &repos, policy);

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(
        account.id(),
        Game::Genshin,
        vec![
            Outcome::RateLimited {
                retry_after: Some(Duration::from_secs(120)),
            },
            Outcome::Success { reward: None },
        ],
    );

    // Pause the clock only after the sqlite setup above: with time paused,
    // the auto-advancing clock races the pool's acquire timeout while the
    // runtime waits on the database's background thread. The real-time
    // sleep first lets the pool's spawned connection-return tasks finish,
    // so no acquire has to wait (and arm that timeout) while paused.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tokio::time::pause();

    let started = tokio::time::Instant::now();
    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(
            vec![pair(&account, Game::Genshin)],
            Local::now().date_naive(),
            cancel,
        )
        .await
        .expect("Run batch");

    assert!(started.elapsed() >= Duration::from_secs(120));
    assert_eq!(result.records[0].status, RecordStatus::Success);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn unusable_session_is_recorded_without_network_calls() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    let coordinator = coordinator(Arc::clone(&client), &repos, fast_policy(3));

    let mut account = account("100000001", [Game::Genshin]);
    account.invalidate_session();
    repos.accounts.save(&account).await.expect("Save account");

    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(
            vec![pair(&account, Game::Genshin)],
            Local::now().date_naive(),
            cancel,
        )
        .await
        .expect("Run batch");

    let record = &result.records[0];
    assert_eq!(record.status, RecordStatus::InvalidCredential);
    assert_eq!(record.attempts, 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn rejected_credential_flags_session_until_refreshed() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    let coordinator = coordinator(Arc::clone(&client), &repos, fast_policy(3));

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(
        account.id(),
        Game::Genshin,
        vec![Outcome::InvalidCredential],
    );

    let today = Local::now().date_naive();
    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(vec![pair(&account, Game::Genshin)], today, cancel)
        .await
        .expect("Run batch");
    assert_eq!(result.records[0].status, RecordStatus::InvalidCredential);
    assert_eq!(client.calls(), 1);

    // The stored account now carries the invalid flag.
    let stored = repos
        .accounts
        .find_by_id(account.id())
        .await
        .expect("Find account")
        .expect("Account should exist");
    assert!(!stored.has_usable_session(Utc::now()));

    // A rerun skips the network entirely.
    let (_cancel_tx, cancel) = watch::channel(false);
    let rerun = coordinator
        .run_due(vec![pair(&account, Game::Genshin)], today, cancel)
        .await
        .expect("Rerun batch");
    assert_eq!(rerun.records[0].status, RecordStatus::InvalidCredential);
    assert_eq!(rerun.records[0].attempts, 0);
    assert_eq!(client.calls(), 1);

    // A refreshed session makes the pair attemptable again.
    let mut refreshed = stored;
    refreshed
        .update_session("stoken=fresh".to_string(), None)
        .expect("Update session");
    repos.accounts.save(&refreshed).await.expect("Save account");
    client.script(
        refreshed.id(),
        Game::Genshin,
        vec![Outcome::Success { reward: None }],
    );

    let (_cancel_tx, cancel) = watch::channel(false);
    let after_refresh = coordinator
        .run_due(vec![pair(&refreshed, Game::Genshin)], today, cancel)
        .await
        .expect("Run after refresh");
    assert_eq!(after_refresh.records[0].status, RecordStatus::Success);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn pairs_are_isolated_within_a_batch() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    let coordinator = coordinator(Arc::clone(&client), &repos, fast_policy(3));

    let healthy = account("100000001", [Game::Genshin]);
    let broken = account("100000002", [Game::StarRail]);
    repos.accounts.save(&healthy).await.expect("Save account");
    repos.accounts.save(&broken).await.expect("Save account");

    client.script(
        healthy.id(),
        Game::Genshin,
        vec![Outcome::Success { reward: None }],
    );
    client.script(
        broken.id(),
        Game::StarRail,
        vec![Outcome::UnknownError {
            detail: "retcode -999".to_string(),
        }],
    );

    let (_cancel_tx, cancel) = watch::channel(false);
    let result = coordinator
        .run_due(
            vec![
                pair(&healthy, Game::Genshin),
                pair(&broken, Game::StarRail),
            ],
            Local::now().date_naive(),
            cancel,
        )
        .await
        .expect("Run batch");

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failed_count, 1);

    let by_account = |id: &str| {
        result
            .records
            .iter()
            .find(|r| r.account_id.as_str() == id)
            .expect("Record for account")
    };
    assert_eq!(by_account("100000001").status, RecordStatus::Success);
    assert_eq!(by_account("100000002").status, RecordStatus::Failed);
}

#[tokio::test]
async fn cancellation_during_backoff_records_cancelled() {
    let repos = in_memory_repos().await;
    let client = ScriptedClient::new();
    // Long backoff so the pair is parked waiting when the cancel arrives.
    let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(60), 3);
    let coordinator = coordinator(Arc::clone(&client), &repos, policy);

    let account = account("100000001", [Game::Genshin]);
    repos.accounts.save(&account).await.expect("Save account");
    client.script(account.id(), Game::Genshin, vec![transient()]);

    let today = Local::now().date_naive();
    let (cancel_tx, cancel) = watch::channel(false);
    let run = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        let pair = pair(&account, Game::Genshin);
        async move { coordinator.run_due(vec![pair], today, cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel_tx.send(true).expect("Send cancel");

    let result = run.await.expect("Join run").expect("Run batch");
    let record = &result.records[0];
    assert_eq!(record.status, RecordStatus::Cancelled);
    assert_eq!(record.attempts, 1);
    // The retry never fired.
    assert_eq!(client.calls(), 1);

    // Cancelled does not complete the day, so the pair stays eligible.
    assert!(!record.status.completes_day());
}

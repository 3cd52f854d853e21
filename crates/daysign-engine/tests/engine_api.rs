use std::sync::Arc;

use chrono::{Days, Local, NaiveTime};

use daysign_domain::checkin::{Outcome, ResultLogRepository, ResultRecord};
use daysign_domain::game::Game;
use daysign_domain::shared::{AccountId, DomainError};
use daysign_engine::Engine;
use daysign_infrastructure::config::EngineConfig;

use test_helpers::{in_memory_repos, Repos, ScriptedClient};

fn engine(repos: &Repos) -> Engine {
    Engine::new(
        EngineConfig::default(),
        ScriptedClient::new(),
        Arc::clone(&repos.accounts),
        Arc::clone(&repos.schedules),
        Arc::clone(&repos.results),
    )
}

async fn add_account(engine: &Engine, id: &str) -> AccountId {
    let account_id = AccountId::from_string(id);
    engine
        .add_account(
            account_id.clone(),
            format!("Account {}", id),
            "stoken=test; mid=test".to_string(),
            None,
            vec![Game::Genshin],
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        )
        .await
        .expect("Add account");
    account_id
}

#[tokio::test]
async fn add_account_rejects_blank_session_token() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let result = engine
        .add_account(
            AccountId::from_string("100000001"),
            "Traveler".to_string(),
            "   ".to_string(),
            None,
            vec![Game::Genshin],
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        )
        .await;

    assert!(matches!(result, Err(DomainError::InvalidCredentials(_))));
    assert!(engine.accounts().await.expect("Accounts").is_empty());
}

#[tokio::test]
async fn add_account_creates_its_schedule_entry() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let id = add_account(&engine, "100000001").await;

    let entries = engine.schedule_entries().await.expect("Entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].account_id(), &id);
    assert_eq!(
        entries[0].time_of_day(),
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn remove_account_clears_account_and_schedule() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let id = add_account(&engine, "100000001").await;
    engine.remove_account(&id).await.expect("Remove account");

    assert!(engine.accounts().await.expect("Accounts").is_empty());
    assert!(engine.schedule_entries().await.expect("Entries").is_empty());
}

#[tokio::test]
async fn set_schedule_updates_the_configured_time() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let id = add_account(&engine, "100000001").await;
    engine.set_schedule(&id, 21, 30).await.expect("Set schedule");

    let entries = engine.schedule_entries().await.expect("Entries");
    assert_eq!(
        entries[0].time_of_day(),
        NaiveTime::from_hms_opt(21, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn set_schedule_validates_account_and_time() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let unknown = AccountId::from_string("999999999");
    assert!(matches!(
        engine.set_schedule(&unknown, 8, 0).await,
        Err(DomainError::AccountNotFound(_))
    ));

    let id = add_account(&engine, "100000001").await;
    assert!(matches!(
        engine.set_schedule(&id, 25, 0).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn prune_results_keeps_recent_days() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let id = add_account(&engine, "100000001").await;
    let today = Local::now().date_naive();
    for age in 0..10u64 {
        let date = today.checked_sub_days(Days::new(age)).unwrap();
        repos
            .results
            .upsert(&ResultRecord::from_outcome(
                id.clone(),
                Game::Genshin,
                date,
                &Outcome::Success { reward: None },
                1,
            ))
            .await
            .expect("Seed record");
    }

    // Cutoff is today minus seven days; ages 8 and 9 fall before it.
    let pruned = engine.prune_results(7).await.expect("Prune results");
    assert_eq!(pruned, 2);

    let remaining = engine.recent_results(20).await.expect("Recent results");
    assert_eq!(remaining.len(), 8);
    assert!(remaining
        .iter()
        .all(|r| r.date >= today.checked_sub_days(Days::new(7)).unwrap()));
}

#[tokio::test]
async fn update_session_requires_an_existing_account() {
    let repos = in_memory_repos().await;
    let engine = engine(&repos);

    let unknown = AccountId::from_string("999999999");
    let result = engine
        .update_session(&unknown, "stoken=fresh".to_string(), None)
        .await;
    assert!(matches!(result, Err(DomainError::AccountNotFound(_))));
}

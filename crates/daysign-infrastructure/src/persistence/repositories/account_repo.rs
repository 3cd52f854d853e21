use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use daysign_domain::account::{Account, AccountRepository, SessionToken};
use daysign_domain::game::Game;
use daysign_domain::shared::{AccountId, DomainError};

#[derive(FromRow)]
struct AccountRow {
    id: String,
    name: String,
    session_token: String,
    session_expires_at: Option<DateTime<Utc>>,
    session_invalidated: bool,
    enabled: bool,
    games: String,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, DomainError> {
        let games: Vec<String> = serde_json::from_str(&self.games)
            .map_err(|e| DomainError::Serialization(format!("games column: {}", e)))?;
        let games: BTreeSet<Game> = games
            .iter()
            .map(|g| Game::parse(g))
            .collect::<Result<_, _>>()?;

        Ok(Account::restore(
            AccountId::from_string(&self.id),
            self.name,
            SessionToken::restore(
                self.session_token,
                self.session_expires_at,
                self.session_invalidated,
            ),
            self.enabled,
            games,
            self.created_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, name, session_token, session_expires_at, \
     session_invalidated, enabled, games, created_at";

pub struct SqliteAccountRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteAccountRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn games_json(account: &Account) -> Result<String, DomainError> {
        let games: Vec<&str> = account.games().map(|g| g.as_str()).collect();
        serde_json::to_string(&games)
            .map_err(|e| DomainError::Serialization(format!("games column: {}", e)))
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO accounts
                (id, name, session_token, session_expires_at,
                 session_invalidated, enabled, games, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = ?2,
                session_token = ?3,
                session_expires_at = ?4,
                session_invalidated = ?5,
                enabled = ?6,
                games = ?7
        "#;

        sqlx::query(query)
            .bind(account.id().as_str())
            .bind(account.name())
            .bind(account.session().secret())
            .bind(account.session().expires_at())
            .bind(account.session().is_invalidated())
            .bind(account.is_enabled())
            .bind(Self::games_json(account)?)
            .bind(account.created_at())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Save account: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let query = format!("SELECT {} FROM accounts WHERE id = ?1", SELECT_COLUMNS);

        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find account by id: {}", e)))?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Account>, DomainError> {
        let query = format!("SELECT {} FROM accounts ORDER BY created_at", SELECT_COLUMNS);

        let rows: Vec<AccountRow> = sqlx::query_as(&query)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find all accounts: {}", e)))?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    async fn find_enabled(&self) -> Result<Vec<Account>, DomainError> {
        let query = format!(
            "SELECT {} FROM accounts WHERE enabled = 1 ORDER BY created_at",
            SELECT_COLUMNS
        );

        let rows: Vec<AccountRow> = sqlx::query_as(&query)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find enabled accounts: {}", e)))?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    async fn delete(&self, id: &AccountId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM accounts WHERE id = ?1")
            .bind(id.as_str())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Delete account: {}", e)))?;

        Ok(())
    }
}

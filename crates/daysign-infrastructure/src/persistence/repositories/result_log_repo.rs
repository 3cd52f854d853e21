use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};

use daysign_domain::checkin::{RecordStatus, ResultLogRepository, ResultRecord};
use daysign_domain::game::Game;
use daysign_domain::shared::{AccountId, DomainError};

#[derive(FromRow)]
struct RecordRow {
    account_id: String,
    game: String,
    date: NaiveDate,
    status: String,
    message: String,
    reward: Option<String>,
    attempts: i64,
}

impl RecordRow {
    fn into_record(self) -> Result<ResultRecord, DomainError> {
        let status = RecordStatus::parse(&self.status).ok_or_else(|| {
            DomainError::Serialization(format!("Unknown record status: {}", self.status))
        })?;

        Ok(ResultRecord {
            account_id: AccountId::from_string(&self.account_id),
            game: Game::parse(&self.game)?,
            date: self.date,
            status,
            message: self.message,
            reward: self.reward,
            attempts: self.attempts.max(0) as u32,
        })
    }
}

const SELECT_COLUMNS: &str = "account_id, game, date, status, message, reward, attempts";

pub struct SqliteResultLogRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteResultLogRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultLogRepository for SqliteResultLogRepository {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), DomainError> {
        // Keyed on (account, game, date); concurrent workers for different
        // pairs never contend on the same key, and a rerun for the same day
        // overwrites in place.
        let query = r#"
            INSERT INTO result_records
                (account_id, game, date, status, message, reward, attempts, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(account_id, game, date) DO UPDATE SET
                status = ?4,
                message = ?5,
                reward = ?6,
                attempts = ?7,
                updated_at = ?8
        "#;

        sqlx::query(query)
            .bind(record.account_id.as_str())
            .bind(record.game.as_str())
            .bind(record.date)
            .bind(record.status.as_str())
            .bind(&record.message)
            .bind(&record.reward)
            .bind(record.attempts as i64)
            .bind(Utc::now())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Upsert result record: {}", e)))?;

        Ok(())
    }

    async fn find(
        &self,
        account_id: &AccountId,
        game: Game,
        date: NaiveDate,
    ) -> Result<Option<ResultRecord>, DomainError> {
        let query = format!(
            "SELECT {} FROM result_records WHERE account_id = ?1 AND game = ?2 AND date = ?3",
            SELECT_COLUMNS
        );

        let row: Option<RecordRow> = sqlx::query_as(&query)
            .bind(account_id.as_str())
            .bind(game.as_str())
            .bind(date)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find result record: {}", e)))?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ResultRecord>, DomainError> {
        let query = format!(
            "SELECT {} FROM result_records WHERE date = ?1 ORDER BY account_id, game",
            SELECT_COLUMNS
        );

        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(date)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find records for date: {}", e)))?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ResultRecord>, DomainError> {
        let query = format!(
            "SELECT {} FROM result_records ORDER BY date DESC, updated_at DESC LIMIT ?1",
            SELECT_COLUMNS
        );

        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(limit as i64)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find recent records: {}", e)))?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn prune_before(&self, date: NaiveDate) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM result_records WHERE date < ?1")
            .bind(date)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Prune result records: {}", e)))?;

        Ok(result.rows_affected())
    }
}

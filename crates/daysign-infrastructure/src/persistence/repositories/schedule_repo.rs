use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, SqlitePool};

use daysign_domain::schedule::{ScheduleEntry, ScheduleRepository};
use daysign_domain::shared::{AccountId, DomainError};

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(FromRow)]
struct ScheduleRow {
    account_id: String,
    time_of_day: String,
    last_completed: Option<NaiveDate>,
}

impl ScheduleRow {
    fn into_entry(self) -> Result<ScheduleEntry, DomainError> {
        let time = NaiveTime::parse_from_str(&self.time_of_day, TIME_FORMAT)
            .map_err(|e| DomainError::Serialization(format!("time_of_day column: {}", e)))?;

        Ok(ScheduleEntry::restore(
            AccountId::from_string(&self.account_id),
            time,
            self.last_completed,
        ))
    }
}

pub struct SqliteScheduleRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteScheduleRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRepository for SqliteScheduleRepository {
    async fn save(&self, entry: &ScheduleEntry) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO schedule_entries (account_id, time_of_day, last_completed)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(account_id) DO UPDATE SET
                time_of_day = ?2,
                last_completed = ?3
        "#;

        sqlx::query(query)
            .bind(entry.account_id().as_str())
            .bind(entry.time_of_day().format(TIME_FORMAT).to_string())
            .bind(entry.last_completed())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Save schedule entry: {}", e)))?;

        Ok(())
    }

    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ScheduleEntry>, DomainError> {
        let query = "SELECT account_id, time_of_day, last_completed \
             FROM schedule_entries WHERE account_id = ?1";

        let row: Option<ScheduleRow> = sqlx::query_as(query)
            .bind(account_id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find schedule entry: {}", e)))?;

        row.map(ScheduleRow::into_entry).transpose()
    }

    async fn find_all(&self) -> Result<Vec<ScheduleEntry>, DomainError> {
        let query =
            "SELECT account_id, time_of_day, last_completed FROM schedule_entries";

        let rows: Vec<ScheduleRow> = sqlx::query_as(query)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Find all schedule entries: {}", e)))?;

        rows.into_iter().map(ScheduleRow::into_entry).collect()
    }

    async fn delete(&self, account_id: &AccountId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM schedule_entries WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DomainError::Repository(format!("Delete schedule entry: {}", e)))?;

        Ok(())
    }
}

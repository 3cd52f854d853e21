use async_trait::async_trait;
use chrono::NaiveDate;

use super::record::ResultRecord;
use crate::game::Game;
use crate::shared::{AccountId, DomainError};

/// Append-only result log keyed by (account, game, date).
///
/// `upsert` must be atomic per key so concurrent workers from different
/// pairs never produce duplicates.
#[async_trait]
pub trait ResultLogRepository: Send + Sync {
    async fn upsert(&self, record: &ResultRecord) -> Result<(), DomainError>;

    async fn find(
        &self,
        account_id: &AccountId,
        game: Game,
        date: NaiveDate,
    ) -> Result<Option<ResultRecord>, DomainError>;

    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<ResultRecord>, DomainError>;

    async fn recent(&self, limit: u32) -> Result<Vec<ResultRecord>, DomainError>;

    /// Retention: drops records older than the given date.
    async fn prune_before(&self, date: NaiveDate) -> Result<u64, DomainError>;
}

use async_trait::async_trait;

use super::ScheduleEntry;
use crate::shared::{AccountId, DomainError};

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn save(&self, entry: &ScheduleEntry) -> Result<(), DomainError>;

    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ScheduleEntry>, DomainError>;

    async fn find_all(&self) -> Result<Vec<ScheduleEntry>, DomainError>;

    async fn delete(&self, account_id: &AccountId) -> Result<(), DomainError>;
}

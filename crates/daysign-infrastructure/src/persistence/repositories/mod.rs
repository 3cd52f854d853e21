mod account_repo;
mod result_log_repo;
mod schedule_repo;

pub use account_repo::SqliteAccountRepository;
pub use result_log_repo::SqliteResultLogRepository;
pub use schedule_repo::SqliteScheduleRepository;

mod client;
mod outcome;
mod record;
mod repository;
mod retry;

pub use client::CheckinClient;
pub use outcome::Outcome;
pub use record::{RecordStatus, ResultRecord};
pub use repository::ResultLogRepository;
pub use retry::{RetryDecision, RetryPolicy};

use std::time::Duration;

use daysign_domain::checkin::RetryPolicy;

/// Engine-wide tunables with the stated defaults. Everything here is
/// configuration, not behavior: the retry shape itself lives in
/// `RetryPolicy`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-attempt network timeout (default: 30 seconds).
    pub request_timeout: Duration,

    /// Backoff base delay (default: 2 seconds).
    pub retry_base_delay: Duration,

    /// Backoff cap (default: 60 seconds).
    pub retry_max_delay: Duration,

    /// Maximum attempts per (account, game) pair per run (default: 3).
    pub max_attempts: u32,

    /// Worker pool size for due pairs (default: 4).
    pub worker_pool_size: usize,

    /// Scheduler tick interval (default: 60 seconds).
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_secs(2),
            retry_max_delay: Duration::from_secs(60),
            max_attempts: 3,
            worker_pool_size: 4,
            tick_interval: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_retry_max_delay(mut self, delay: Duration) -> Self {
        self.retry_max_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_base_delay,
            self.retry_max_delay,
            self.max_attempts,
        )
    }
}

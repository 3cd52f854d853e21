use std::time::Duration;

use super::outcome::Outcome;

/// Decision for one completed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Stop the loop; this outcome is final for the day.
    Terminal(Outcome),
    /// Try again after waiting the given delay.
    RetryAfter(Duration),
}

/// Pure backoff policy: outcome + attempt number in, decision out.
///
/// Lives in the domain so backoff behavior is testable without any network
/// mocking.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is 1-based: the decision for the attempt that just ran.
    pub fn decide(&self, outcome: &Outcome, attempt: u32) -> RetryDecision {
        if !outcome.is_retryable() {
            return RetryDecision::Terminal(outcome.clone());
        }

        if attempt >= self.max_attempts {
            return RetryDecision::Terminal(outcome.clone());
        }

        let backoff = self.backoff_for(attempt);
        let delay = match outcome {
            // Honor a server-provided hint when it is larger than our own
            // backoff.
            Outcome::RateLimited {
                retry_after: Some(hint),
            } => backoff.max(*hint),
            _ => backoff,
        };

        RetryDecision::RetryAfter(delay)
    }

    /// base * 2^(attempt-1), capped.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(60), 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> Outcome {
        Outcome::TransientError {
            detail: "connection reset".into(),
        }
    }

    #[test]
    fn terminal_outcomes_never_retry() {
        let policy = RetryPolicy::default();
        for outcome in [
            Outcome::Success { reward: None },
            Outcome::AlreadyDone {
                message: "signed".into(),
            },
            Outcome::InvalidCredential,
            Outcome::ChallengeRequired,
            Outcome::UnknownError {
                detail: "shape".into(),
            },
        ] {
            assert_eq!(
                policy.decide(&outcome, 1),
                RetryDecision::Terminal(outcome.clone())
            );
        }
    }

    #[test]
    fn transient_backs_off_exponentially() {
        let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(60), 5);

        assert_eq!(
            policy.decide(&transient(), 1),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(&transient(), 2),
            RetryDecision::RetryAfter(Duration::from_secs(4))
        );
        assert_eq!(
            policy.decide(&transient(), 3),
            RetryDecision::RetryAfter(Duration::from_secs(8))
        );
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let policy = RetryPolicy::new(Duration::from_secs(20), Duration::from_secs(45), 10);
        assert_eq!(
            policy.decide(&transient(), 4),
            RetryDecision::RetryAfter(Duration::from_secs(45))
        );
    }

    #[test]
    fn exceeding_max_attempts_is_terminal_failure() {
        let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(60), 3);
        assert_eq!(
            policy.decide(&transient(), 3),
            RetryDecision::Terminal(transient())
        );
    }

    #[test]
    fn rate_limit_hint_wins_over_smaller_backoff() {
        let policy = RetryPolicy::new(Duration::from_secs(20), Duration::from_secs(300), 3);
        let limited = Outcome::RateLimited {
            retry_after: Some(Duration::from_secs(120)),
        };
        assert_eq!(
            policy.decide(&limited, 1),
            RetryDecision::RetryAfter(Duration::from_secs(120))
        );
    }

    #[test]
    fn computed_backoff_wins_over_smaller_hint() {
        let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(300), 3);
        let limited = Outcome::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(
            policy.decide(&limited, 1),
            RetryDecision::RetryAfter(Duration::from_secs(30))
        );
    }
}

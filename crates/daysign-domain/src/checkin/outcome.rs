use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classified result of one check-in attempt against the remote service.
///
/// The check-in client never raises network or parse failures; everything
/// it can encounter maps into one of these variants before it returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Check-in performed; reward description captured when available.
    Success { reward: Option<String> },
    /// The remote reports the account already checked in today. Terminal
    /// success, not a failure.
    AlreadyDone { message: String },
    /// The remote is throttling us; may carry a server-provided hint.
    RateLimited { retry_after: Option<Duration> },
    /// Token rejected or expired. Requires user action (re-login).
    InvalidCredential,
    /// The remote demands interactive verification the engine cannot
    /// satisfy.
    ChallengeRequired,
    /// Network error, timeout or 5xx. Retryable.
    TransientError { detail: String },
    /// Unexpected response shape. Not retryable, surfaced as-is.
    UnknownError { detail: String },
}

impl Outcome {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::TransientError { .. } | Outcome::RateLimited { .. }
        )
    }

    /// Short label used in logs and result messages.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::AlreadyDone { .. } => "already_done",
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::InvalidCredential => "invalid_credential",
            Outcome::ChallengeRequired => "challenge_required",
            Outcome::TransientError { .. } => "transient_error",
            Outcome::UnknownError { .. } => "unknown_error",
        }
    }
}

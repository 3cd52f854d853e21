use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::outcome::Outcome;
use crate::game::Game;
use crate::shared::AccountId;

/// Terminal classification persisted in the result log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    AlreadyDone,
    Failed,
    InvalidCredential,
    ChallengeRequired,
    Cancelled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::AlreadyDone => "already_done",
            RecordStatus::Failed => "failed",
            RecordStatus::InvalidCredential => "invalid_credential",
            RecordStatus::ChallengeRequired => "challenge_required",
            RecordStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RecordStatus::Success),
            "already_done" => Some(RecordStatus::AlreadyDone),
            "failed" => Some(RecordStatus::Failed),
            "invalid_credential" => Some(RecordStatus::InvalidCredential),
            "challenge_required" => Some(RecordStatus::ChallengeRequired),
            "cancelled" => Some(RecordStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status completes the day. Completed days advance the
    /// schedule; a cancelled pair stays eligible for the next tick.
    pub fn completes_day(&self) -> bool {
        !matches!(self, RecordStatus::Cancelled)
    }

    /// Statuses that need user action (re-login) and are surfaced
    /// prominently in the feed.
    pub fn needs_user_action(&self) -> bool {
        matches!(
            self,
            RecordStatus::InvalidCredential | RecordStatus::ChallengeRequired
        )
    }
}

/// One durable (account, game, day) outcome. At most one record exists per
/// key; a later run for the same day overwrites, never duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub account_id: AccountId,
    pub game: Game,
    pub date: NaiveDate,
    pub status: RecordStatus,
    pub message: String,
    pub reward: Option<String>,
    pub attempts: u32,
}

impl ResultRecord {
    /// Folds a terminal outcome into the persisted record form.
    pub fn from_outcome(
        account_id: AccountId,
        game: Game,
        date: NaiveDate,
        outcome: &Outcome,
        attempts: u32,
    ) -> Self {
        let (status, message, reward) = match outcome {
            Outcome::Success { reward } => (
                RecordStatus::Success,
                "Check-in successful".to_string(),
                reward.clone(),
            ),
            Outcome::AlreadyDone { message } => {
                (RecordStatus::AlreadyDone, message.clone(), None)
            }
            Outcome::InvalidCredential => (
                RecordStatus::InvalidCredential,
                "Session token rejected; please log in again".to_string(),
                None,
            ),
            Outcome::ChallengeRequired => (
                RecordStatus::ChallengeRequired,
                "Remote requires interactive verification".to_string(),
                None,
            ),
            Outcome::TransientError { detail } => (
                RecordStatus::Failed,
                format!("Gave up after transient errors: {}", detail),
                None,
            ),
            Outcome::RateLimited { .. } => (
                RecordStatus::Failed,
                "Gave up while rate limited".to_string(),
                None,
            ),
            Outcome::UnknownError { detail } => (
                RecordStatus::Failed,
                format!("Unexpected response: {}", detail),
                None,
            ),
        };

        Self {
            account_id,
            game,
            date,
            status,
            message,
            reward,
            attempts,
        }
    }

    pub fn cancelled(account_id: AccountId, game: Game, date: NaiveDate, attempts: u32) -> Self {
        Self {
            account_id,
            game,
            date,
            status: RecordStatus::Cancelled,
            message: "Run cancelled before a terminal outcome".to_string(),
            reward: None,
            attempts,
        }
    }
}

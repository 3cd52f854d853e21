use daysign_domain::checkin::ResultRecord;
use daysign_domain::shared::AccountId;

/// Push feed consumed by the UI collaborator.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A terminal (or cancelled) outcome was written to the result log.
    RecordWritten(ResultRecord),
    /// An account's schedule changed (time-of-day or completion advance).
    ScheduleUpdated { account_id: AccountId },
    /// A scheduling tick could not read or write persisted state. The next
    /// tick retries normally.
    TickFailed { error: String },
}

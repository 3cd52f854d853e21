use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::shared::{AccountId, DomainError};

/// Per-account schedule state: configured local time-of-day plus the last
/// calendar day a run reached a terminal outcome.
///
/// All arithmetic is on naive local wall-clock time; callers pass
/// `Local::now().naive_local()` so the state machine is testable with a
/// fixed clock.
///
/// Invariant: a day that was missed while the process was offline yields at
/// most one immediate catch-up run. Only "today" is ever considered due;
/// there is no backlog replay of older missed days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    account_id: AccountId,
    time_of_day: NaiveTime,
    last_completed: Option<NaiveDate>,
}

impl ScheduleEntry {
    pub const DEFAULT_TIME_OF_DAY: (u32, u32) = (8, 0);

    pub fn new(account_id: AccountId, time_of_day: NaiveTime) -> Self {
        Self {
            account_id,
            time_of_day,
            last_completed: None,
        }
    }

    pub fn restore(
        account_id: AccountId,
        time_of_day: NaiveTime,
        last_completed: Option<NaiveDate>,
    ) -> Self {
        Self {
            account_id,
            time_of_day,
            last_completed,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.time_of_day
    }

    pub fn last_completed(&self) -> Option<NaiveDate> {
        self.last_completed
    }

    pub fn set_time_of_day(&mut self, hour: u32, minute: u32) -> Result<(), DomainError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            DomainError::Validation(format!("Invalid time of day: {}:{:02}", hour, minute))
        })?;
        self.time_of_day = time;
        Ok(())
    }

    /// Earliest future instant at or after the configured time-of-day,
    /// strictly after `last_completed`. When the process slept past the
    /// due instant this returns `now` (one immediate catch-up run), never
    /// a backdated burst.
    pub fn next_due(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let today_run = today.and_time(self.time_of_day);

        if self.completed_on(today) {
            return self.tomorrow_run(today);
        }

        if today_run <= now {
            // Missed (or just reached) today's slot: due immediately.
            now
        } else {
            today_run
        }
    }

    /// Due = the configured instant for today has passed and today has not
    /// completed yet. Covers both the normal daily trigger and the single
    /// catch-up after downtime.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        let today = now.date();
        !self.completed_on(today) && today.and_time(self.time_of_day) <= now
    }

    /// Advances the schedule after a terminal outcome. Never moves
    /// backwards.
    pub fn mark_completed(&mut self, date: NaiveDate) {
        match self.last_completed {
            Some(prev) if prev >= date => {}
            _ => self.last_completed = Some(date),
        }
    }

    fn completed_on(&self, date: NaiveDate) -> bool {
        self.last_completed.is_some_and(|d| d >= date)
    }

    fn tomorrow_run(&self, today: NaiveDate) -> NaiveDateTime {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
            .and_time(self.time_of_day)
    }
}

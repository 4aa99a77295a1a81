//! Focus sessions and daily goals

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

use super::TaskId;

/// Format used for calendar-day keys
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar-day key (`YYYY-MM-DD`) of an instant, taken from its ISO form
pub fn date_key(instant: DateTime<Utc>) -> String {
    instant.format(DATE_KEY_FORMAT).to_string()
}

/// Check that a string is a real `YYYY-MM-DD` day
pub fn validate_date_key(date: &str) -> Result<(), ValidationError> {
    if date.len() == 10 && NaiveDate::parse_from_str(date, DATE_KEY_FORMAT).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate(date.to_string()))
    }
}

/// A finished timer run, complete or abandoned
///
/// Sessions are an append-only log; nothing mutates a record once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    /// Focused seconds (elapsed, not planned)
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

/// Fields of a session before it is given an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
    #[serde(default)]
    pub task_id: Option<TaskId>,
}

impl FocusSession {
    pub fn from_input(input: SessionInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            duration: input.duration,
            start_time: input.start_time,
            end_time: input.end_time,
            completed: input.completed,
            task_id: input.task_id,
        }
    }

    /// Whether the session started on the given day key.
    ///
    /// This is a prefix match on the UTC ISO timestamp, so the day boundary
    /// is UTC midnight regardless of the caller's local timezone.
    pub fn started_on(&self, day_key: &str) -> bool {
        self.start_time
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .starts_with(day_key)
    }
}

/// Target focus minutes for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub date: String,
    pub target_minutes: u32,
}

//! Persisted timer snapshot and wall-clock reconciliation
//!
//! `time_left_seconds` is only valid as of `last_update_time`. Any reader
//! of a running snapshot must subtract the wall-clock time elapsed since then.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest planned duration a stored snapshot may carry
pub const MAX_PLANNED_SECONDS: u64 = 24 * 60 * 60;

/// Observable phase of the timer
///
/// Completion is not a resting phase: a finished run is recorded and the
/// timer folds straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Snapshot written to the `memphis_timer_state` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub planned_duration_seconds: u64,
    pub time_left_seconds: u64,
    pub is_active: bool,
    pub is_paused: bool,
    #[serde(default)]
    pub session_start_time: Option<DateTime<Utc>>,
    pub last_update_time: DateTime<Utc>,
}

impl TimerSnapshot {
    /// A fresh, idle timer
    pub fn idle(planned_duration_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            planned_duration_seconds,
            time_left_seconds: planned_duration_seconds,
            is_active: false,
            is_paused: false,
            session_start_time: None,
            last_update_time: now,
        }
    }

    /// A running timer as it would have been persisted at `last_update_time`
    pub fn running_from(
        planned_duration_seconds: u64,
        time_left_seconds: u64,
        session_start_time: DateTime<Utc>,
        last_update_time: DateTime<Utc>,
    ) -> Self {
        Self {
            planned_duration_seconds,
            time_left_seconds,
            is_active: true,
            is_paused: false,
            session_start_time: Some(session_start_time),
            last_update_time,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.is_active, self.is_paused) {
            (false, _) => TimerPhase::Idle,
            (true, true) => TimerPhase::Paused,
            (true, false) => TimerPhase::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TimerPhase::Running
    }

    /// Repair a snapshot read from storage, `None` if it cannot describe a timer
    pub fn normalized(mut self) -> Option<Self> {
        if self.planned_duration_seconds == 0 || self.planned_duration_seconds > MAX_PLANNED_SECONDS {
            return None;
        }
        self.time_left_seconds = self.time_left_seconds.min(self.planned_duration_seconds);
        if self.is_paused && !self.is_active {
            self.is_paused = false;
        }
        if !self.is_active {
            self.session_start_time = None;
        }
        Some(self)
    }

    /// Whole seconds of wall-clock time since the snapshot was taken.
    /// A clock that moved backwards counts as no time.
    pub fn whole_seconds_since_update(&self, now: DateTime<Utc>) -> u64 {
        (now - self.last_update_time).num_seconds().max(0) as u64
    }

    /// Remaining seconds reconciled against the wall clock
    pub fn effective_time_left(&self, now: DateTime<Utc>) -> u64 {
        if self.is_running() {
            self.time_left_seconds
                .saturating_sub(self.whole_seconds_since_update(now))
        } else {
            self.time_left_seconds
        }
    }

    /// Seconds of the current run already spent focusing
    pub fn elapsed_focus_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.planned_duration_seconds
            .saturating_sub(self.effective_time_left(now))
    }

    /// Instant the countdown reaches (or reached) zero if left running
    pub fn projected_end(&self) -> DateTime<Utc> {
        let left = self.time_left_seconds.min(MAX_PLANNED_SECONDS) as i64;
        self.last_update_time
            .checked_add_signed(Duration::seconds(left))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

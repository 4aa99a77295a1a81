//! Read model published to every timer surface

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{TimerPhase, TimerSnapshot};

/// Timer state as any surface should display it, reconciled at `as_of`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub phase: TimerPhase,
    pub planned_duration_seconds: u64,
    /// Effective time left, never the raw persisted value
    pub time_left_seconds: u64,
    pub is_active: bool,
    pub is_paused: bool,
    pub session_start_time: Option<DateTime<Utc>>,
    /// Share of the planned duration already spent, 0-100
    pub progress_percent: f64,
    /// `MM:SS` rendering of the time left
    pub display: String,
    /// Header badge text, present only while the countdown is live
    pub badge: Option<String>,
    pub as_of: DateTime<Utc>,
}

impl TimerView {
    pub fn from_snapshot(snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Self {
        let time_left = snapshot.effective_time_left(now);
        let planned = snapshot.planned_duration_seconds;
        let progress_percent = if planned > 0 {
            (planned.saturating_sub(time_left) as f64 / planned as f64) * 100.0
        } else {
            0.0
        };

        let display = format_clock(time_left);
        let badge = snapshot.is_running().then(|| display.clone());

        Self {
            phase: snapshot.phase(),
            planned_duration_seconds: planned,
            time_left_seconds: time_left,
            is_active: snapshot.is_active,
            is_paused: snapshot.is_paused,
            session_start_time: snapshot.session_start_time,
            progress_percent,
            display,
            badge,
            as_of: now,
        }
    }

    /// Whether two views would render identically
    pub fn same_display(&self, other: &TimerView) -> bool {
        self.phase == other.phase
            && self.time_left_seconds == other.time_left_seconds
            && self.planned_duration_seconds == other.planned_duration_seconds
    }
}

/// Format seconds as MM:SS (minutes are not wrapped into hours)
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format seconds as "1h 5m" or "25m"
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

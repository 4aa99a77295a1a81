//! Dashboard aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::{TimerPhase, TimerView};

use super::DataLayer;

/// Today's progress at a glance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub sessions_today: usize,
    pub completed_sessions_today: usize,
    /// Seconds recorded in today's sessions
    pub focus_seconds_today: u64,
    /// Seconds already spent in the run that is counting down right now
    pub live_run_seconds: u64,
    pub goal_minutes: u32,
    pub focused_minutes: u64,
    pub remaining_minutes: u64,
    /// Share of today's goal already reached, capped at 100
    pub goal_percent: f64,
}

impl DashboardStats {
    pub fn compute(data: &DataLayer, timer: &TimerView, now: DateTime<Utc>) -> Self {
        let focus_seconds_today = data.total_focus_seconds_today(now);
        let live_run_seconds = if timer.phase == TimerPhase::Running {
            timer
                .planned_duration_seconds
                .saturating_sub(timer.time_left_seconds)
        } else {
            0
        };

        let goal_minutes = data.today_goal_minutes(now);
        let focused_minutes = (focus_seconds_today + live_run_seconds + 30) / 60;

        Self {
            total_tasks: data.tasks().len(),
            completed_tasks: data.completed_task_count(),
            pending_tasks: data.pending_task_count(),
            sessions_today: data.todays_sessions(now).len(),
            completed_sessions_today: data.completed_sessions_today(now),
            focus_seconds_today,
            live_run_seconds,
            goal_minutes,
            focused_minutes,
            remaining_minutes: u64::from(goal_minutes).saturating_sub(focused_minutes),
            goal_percent: goal_percent(focused_minutes, goal_minutes),
        }
    }
}

fn goal_percent(focused_minutes: u64, goal_minutes: u32) -> f64 {
    if goal_minutes == 0 {
        return 100.0;
    }
    (focused_minutes as f64 / f64::from(goal_minutes) * 100.0).min(100.0)
}

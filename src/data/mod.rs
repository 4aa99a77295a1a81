//! Tasks, focus sessions and daily goals
//!
//! The `DataLayer` keeps each collection in memory and writes the whole
//! collection back to the store after every mutation. A failed write leaves
//! the in-memory state authoritative until the next successful one.

mod dashboard;

pub use dashboard::DashboardStats;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::model::{
    date_key, validate_date_key, DailyGoal, FocusSession, Priority, SessionInput, Task, TaskInput,
    TaskUpdate,
};
use crate::store::{PersistentStore, StorageKey};

/// In-memory collections mirrored to the persistent store
#[derive(Debug)]
pub struct DataLayer {
    store: PersistentStore,
    /// Most recent first
    tasks: Vec<Task>,
    /// Most recent first
    sessions: Vec<FocusSession>,
    goals: Vec<DailyGoal>,
    default_goal_minutes: u32,
}

impl DataLayer {
    /// Load all collections, substituting empty ones for missing or corrupt slots
    pub fn load(store: PersistentStore, default_goal_minutes: u32) -> Self {
        let tasks: Vec<Task> = store.get_or_default(StorageKey::Tasks);
        let sessions: Vec<FocusSession> = store.get_or_default(StorageKey::Sessions);
        let goals: Vec<DailyGoal> = store.get_or_default(StorageKey::Goals);

        debug!(
            "Loaded {} tasks, {} sessions, {} goals",
            tasks.len(),
            sessions.len(),
            goals.len()
        );

        Self {
            store,
            tasks,
            sessions,
            goals,
            default_goal_minutes,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn sessions(&self) -> &[FocusSession] {
        &self.sessions
    }

    pub fn goals(&self) -> &[DailyGoal] {
        &self.goals
    }

    // Tasks

    /// Validate and add a task at the front of the collection
    pub fn add_task(&mut self, input: TaskInput, now: DateTime<Utc>) -> Result<Task, ValidationError> {
        let task = Task::from_input(input, now)?;
        self.tasks.insert(0, task.clone());
        self.persist_tasks();
        info!("Added task {} ({})", task.id, task.priority.as_str());
        Ok(task)
    }

    /// Patch a task. An unknown id is not an error and changes nothing.
    pub fn update_task(
        &mut self,
        id: &str,
        update: &TaskUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, ValidationError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("Update for unknown task {}", id);
            return Ok(None);
        };
        task.apply(update, now)?;
        let updated = task.clone();
        self.persist_tasks();
        Ok(Some(updated))
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        let removed = self.tasks.remove(index);
        self.persist_tasks();
        info!("Deleted task {}", id);
        Some(removed)
    }

    pub fn toggle_task(&mut self, id: &str, now: DateTime<Utc>) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.toggle(now);
        let toggled = task.clone();
        self.persist_tasks();
        Some(toggled)
    }

    pub fn tasks_by_priority(&self, priority: Priority) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.priority == priority).collect()
    }

    pub fn completed_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn pending_task_count(&self) -> usize {
        self.tasks.len() - self.completed_task_count()
    }

    // Sessions

    /// Append a session record at the front of the log
    pub fn add_session(&mut self, input: SessionInput) -> FocusSession {
        let session = FocusSession::from_input(input);
        self.sessions.insert(0, session.clone());
        self.persist_sessions();
        session
    }

    /// Append a finished timer run, once.
    ///
    /// A completed run is identified by its start time, so replaying a
    /// completion that was recorded before a crash adds nothing.
    pub fn record_run(&mut self, run: SessionInput) -> Option<FocusSession> {
        if run.completed
            && self
                .sessions
                .iter()
                .any(|s| s.completed && s.start_time == run.start_time)
        {
            debug!("Run started at {} already recorded", run.start_time);
            return None;
        }
        Some(self.add_session(run))
    }

    /// Sessions whose start falls on the UTC calendar day of `now`
    pub fn todays_sessions(&self, now: DateTime<Utc>) -> Vec<&FocusSession> {
        let today = date_key(now);
        self.sessions.iter().filter(|s| s.started_on(&today)).collect()
    }

    pub fn completed_sessions_today(&self, now: DateTime<Utc>) -> usize {
        self.todays_sessions(now).iter().filter(|s| s.completed).count()
    }

    /// Focused seconds today, abandoned runs included
    pub fn total_focus_seconds_today(&self, now: DateTime<Utc>) -> u64 {
        self.todays_sessions(now).iter().map(|s| s.duration).sum()
    }

    // Goals

    /// Insert or replace the goal for a day
    pub fn set_goal(&mut self, date: &str, target_minutes: i64) -> Result<DailyGoal, ValidationError> {
        if target_minutes <= 0 {
            return Err(ValidationError::NonPositiveGoal);
        }
        validate_date_key(date)?;

        let goal = DailyGoal {
            date: date.to_string(),
            target_minutes: u32::try_from(target_minutes).unwrap_or(u32::MAX),
        };
        match self.goals.iter_mut().find(|g| g.date == goal.date) {
            Some(existing) => *existing = goal.clone(),
            None => self.goals.push(goal.clone()),
        }
        self.persist_goals();
        info!("Goal for {} set to {} minutes", goal.date, goal.target_minutes);
        Ok(goal)
    }

    pub fn goal_for(&self, date: &str) -> Option<&DailyGoal> {
        self.goals.iter().find(|g| g.date == date)
    }

    pub fn today_goal(&self, now: DateTime<Utc>) -> Option<&DailyGoal> {
        self.goal_for(&date_key(now))
    }

    /// Today's target, or the configured default when none is set
    pub fn today_goal_minutes(&self, now: DateTime<Utc>) -> u32 {
        self.today_goal(now)
            .map(|g| g.target_minutes)
            .unwrap_or(self.default_goal_minutes)
    }

    fn persist_tasks(&self) {
        let _ = self.store.set(StorageKey::Tasks, &self.tasks);
    }

    fn persist_sessions(&self) {
        let _ = self.store.set(StorageKey::Sessions, &self.sessions);
    }

    fn persist_goals(&self) {
        let _ = self.store.set(StorageKey::Goals, &self.goals);
    }
}

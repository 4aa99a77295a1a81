//! The focus hub: single owner of timer, data and offline queue
//!
//! Every surface (HTTP routes, the ticker, the sync worker) goes through one
//! `FocusHub`, so the wall-clock reconciliation runs in exactly one place.
//! Mutations are applied to the data layer first and then offered to the
//! offline queue, which keeps them only while disconnected.

mod handle;

pub use handle::{spawn_sync_worker, HubHandle};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::config::Config;
use crate::data::{DashboardStats, DataLayer};
use crate::error::ValidationError;
use crate::model::{DailyGoal, FocusSession, Priority, SessionInput, Task, TaskInput, TaskUpdate};
use crate::offline::{Mutation, OfflineQueue, ReplayReport, SyncRegistrar, SyncScope};
use crate::store::{PersistentStore, Warning};
use crate::timer::{DurationBounds, SessionSink, TimerEvent, TimerMachine, TimerView};

/// Tunables taken from the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub default_timer_seconds: u64,
    pub duration_bounds: DurationBounds,
    pub default_goal_minutes: u32,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            default_timer_seconds: 25 * 60,
            duration_bounds: DurationBounds::default(),
            default_goal_minutes: 60,
        }
    }
}

impl HubSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_timer_seconds: config.default_timer_seconds(),
            duration_bounds: DurationBounds {
                min_minutes: config.min_timer_minutes,
                max_minutes: config.max_timer_minutes,
            },
            default_goal_minutes: config.default_daily_goal_minutes,
        }
    }
}

/// Sink handed to the timer: persists each finished run through the data
/// layer immediately and remembers what was actually added
struct SessionRecorder<'a> {
    data: &'a mut DataLayer,
    recorded: Vec<FocusSession>,
}

impl SessionSink for SessionRecorder<'_> {
    fn record_run(&mut self, run: SessionInput) {
        if let Some(session) = self.data.record_run(run) {
            self.recorded.push(session);
        }
    }
}

pub struct FocusHub {
    clock: Arc<dyn Clock>,
    store: PersistentStore,
    data: DataLayer,
    timer: TimerMachine,
    queue: OfflineQueue,
}

impl std::fmt::Debug for FocusHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusHub")
            .field("timer", &self.timer.snapshot())
            .field("tasks", &self.data.tasks().len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl FocusHub {
    /// Load every collection and reconcile the timer, recording a run that
    /// finished while nothing was running
    pub fn open(
        store: PersistentStore,
        clock: Arc<dyn Clock>,
        registrar: Arc<dyn SyncRegistrar>,
        settings: HubSettings,
    ) -> Self {
        let now = clock.now();
        let data = DataLayer::load(store.clone(), settings.default_goal_minutes);
        let timer = TimerMachine::load(
            store.clone(),
            settings.default_timer_seconds,
            settings.duration_bounds,
            now,
        );
        let queue = OfflineQueue::load(store.clone(), registrar);

        let mut hub = Self {
            clock,
            store,
            data,
            timer,
            queue,
        };
        hub.with_timer(|timer, now, sink| timer.poll(now, sink));
        hub
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn data(&self) -> &DataLayer {
        &self.data
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    // Timer

    /// Reconciled timer state; completes a run that has run out
    pub fn timer_view(&mut self) -> TimerView {
        self.with_timer(|timer, now, sink| timer.poll(now, sink)).0
    }

    pub fn start_timer(&mut self) -> TimerEvent {
        self.with_timer(|timer, now, sink| timer.start(now, sink))
    }

    pub fn pause_resume_timer(&mut self) -> TimerEvent {
        self.with_timer(|timer, now, sink| timer.pause_resume(now, sink))
    }

    pub fn reset_timer(&mut self) -> TimerEvent {
        self.with_timer(|timer, now, sink| timer.reset(now, sink))
    }

    pub fn set_duration(&mut self, minutes: u64) -> Result<TimerEvent, ValidationError> {
        self.with_timer(|timer, now, sink| timer.set_duration(minutes, now, sink))
    }

    pub fn tick(&mut self) -> TimerEvent {
        self.with_timer(|timer, now, sink| timer.tick(now, sink))
    }

    /// Run a timer transition with a recorder sink, then queue any sessions
    /// it appended
    fn with_timer<R>(
        &mut self,
        transition: impl FnOnce(&mut TimerMachine, DateTime<Utc>, &mut dyn SessionSink) -> R,
    ) -> R {
        let now = self.clock.now();
        let mut recorder = SessionRecorder {
            data: &mut self.data,
            recorded: Vec::new(),
        };
        let result = transition(&mut self.timer, now, &mut recorder);

        for session in recorder.recorded {
            self.queue.record(Mutation::AddSession(session), now);
        }
        result
    }

    // Tasks

    pub fn tasks(&self, priority: Option<Priority>) -> Vec<Task> {
        match priority {
            Some(p) => self.data.tasks_by_priority(p).into_iter().cloned().collect(),
            None => self.data.tasks().to_vec(),
        }
    }

    pub fn add_task(&mut self, input: TaskInput) -> Result<Task, ValidationError> {
        let now = self.now();
        let task = self.data.add_task(input, now)?;
        self.queue.record(Mutation::AddTask(task.clone()), now);
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, update: &TaskUpdate) -> Result<Option<Task>, ValidationError> {
        let now = self.now();
        let updated = self.data.update_task(id, update, now)?;
        if let Some(task) = &updated {
            self.queue.record(Mutation::UpdateTask(task.clone()), now);
        }
        Ok(updated)
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let now = self.now();
        let removed = self.data.delete_task(id)?;
        self.queue.record(
            Mutation::DeleteTask {
                id: removed.id.clone(),
            },
            now,
        );
        Some(removed)
    }

    pub fn toggle_task(&mut self, id: &str) -> Option<Task> {
        let now = self.now();
        let toggled = self.data.toggle_task(id, now)?;
        self.queue.record(
            Mutation::ToggleTask {
                id: toggled.id.clone(),
                completed: toggled.completed,
            },
            now,
        );
        Some(toggled)
    }

    // Sessions and goals

    /// Today's sessions, after recording a run that has just run out
    pub fn todays_sessions(&mut self) -> Vec<FocusSession> {
        let now = self.timer_view().as_of;
        self.data
            .todays_sessions(now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn today_goal(&self) -> Option<DailyGoal> {
        self.data.today_goal(self.now()).cloned()
    }

    pub fn today_goal_minutes(&self) -> u32 {
        self.data.today_goal_minutes(self.now())
    }

    pub fn set_goal(&mut self, date: &str, target_minutes: i64) -> Result<DailyGoal, ValidationError> {
        let now = self.now();
        let goal = self.data.set_goal(date, target_minutes)?;
        self.queue.record(Mutation::SetGoal(goal.clone()), now);
        Ok(goal)
    }

    pub fn dashboard(&mut self) -> DashboardStats {
        let view = self.timer_view();
        DashboardStats::compute(&self.data, &view, view.as_of)
    }

    // Connectivity and sync

    pub fn is_online(&self) -> bool {
        self.queue.is_online()
    }

    pub fn set_online(&mut self, online: bool) -> bool {
        self.queue.set_online(online)
    }

    /// Replay queued entries. Does nothing while offline: the sync
    /// facility only fires once connectivity is back.
    pub fn replay(&mut self, scope: SyncScope) -> Option<ReplayReport> {
        if !self.queue.is_online() {
            debug!("Ignoring {:?} replay while offline", scope);
            return None;
        }
        Some(self.queue.replay(scope))
    }

    /// Non-fatal storage and sync warnings, oldest first
    pub fn warnings(&self) -> Vec<Warning> {
        self.store.warnings().all()
    }
}

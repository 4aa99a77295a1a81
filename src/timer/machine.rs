//! Focus timer state machine
//!
//! Idle --start--> Running --pause--> Paused --resume--> Running
//! Running --tick--> Running | (Completed -> Idle)
//! Running | Paused --reset--> Idle
//!
//! Every transition first reconciles against the wall clock, so a run that
//! ran out while nobody was looking is completed before anything else
//! happens. Each transition persists its result before returning: a running
//! or paused timer is written to `memphis_timer_state`, an idle timer is the
//! absence of that slot.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::model::SessionInput;
use crate::store::{PersistentStore, StorageKey};

use super::state::{TimerPhase, TimerSnapshot, MAX_PLANNED_SECONDS};
use super::view::{format_duration, TimerView};

/// Receiver of finished runs
pub trait SessionSink {
    /// Record a finished run. Must tolerate seeing the same completed run twice.
    fn record_run(&mut self, run: SessionInput);
}

impl SessionSink for Vec<SessionInput> {
    fn record_run(&mut self, run: SessionInput) {
        self.push(run);
    }
}

/// Accepted range for the planned duration, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBounds {
    pub min_minutes: u64,
    pub max_minutes: u64,
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min_minutes: 1,
            max_minutes: 60,
        }
    }
}

impl DurationBounds {
    pub fn check(&self, minutes: u64) -> Result<(), ValidationError> {
        if minutes < self.min_minutes || minutes > self.max_minutes {
            return Err(ValidationError::DurationOutOfRange {
                min: self.min_minutes,
                max: self.max_minutes,
                got: minutes,
            });
        }
        Ok(())
    }
}

/// What a transition did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Started,
    Paused,
    Resumed,
    /// The countdown advanced; carries the new time left
    Ticked(u64),
    /// The run reached zero and was recorded as complete
    Completed(SessionInput),
    /// A run in progress was reset and recorded as incomplete
    Abandoned(SessionInput),
    /// Reset with nothing worth recording
    Cleared,
    DurationChanged(u64),
    /// The call did not apply in the current phase
    Unchanged,
}

/// The single owner of timer state
#[derive(Debug)]
pub struct TimerMachine {
    store: PersistentStore,
    state: TimerSnapshot,
    bounds: DurationBounds,
}

impl TimerMachine {
    /// Restore the timer from storage, falling back to an idle default
    pub fn load(
        store: PersistentStore,
        default_duration_seconds: u64,
        bounds: DurationBounds,
        now: DateTime<Utc>,
    ) -> Self {
        let state = store
            .get_opt::<TimerSnapshot>(StorageKey::TimerState)
            .and_then(TimerSnapshot::normalized)
            .unwrap_or_else(|| TimerSnapshot::idle(default_duration_seconds, now));

        if state.is_active {
            debug!(
                "Restored {:?} timer with {}s left as of {}",
                state.phase(),
                state.time_left_seconds,
                state.last_update_time
            );
        }

        Self {
            store,
            state,
            bounds,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> &TimerSnapshot {
        &self.state
    }

    /// Reconciled view without side effects.
    ///
    /// A run that has already reached zero shows as 00:00 here; `poll`
    /// is the read that also records it.
    pub fn view(&self, now: DateTime<Utc>) -> TimerView {
        TimerView::from_snapshot(&self.state, now)
    }

    /// Reconciled view, completing a run that ran out since the last read
    pub fn poll(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> (TimerView, Option<TimerEvent>) {
        let event = self.reconcile(now, sink);
        (self.view(now), event)
    }

    pub fn start(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> TimerEvent {
        if let Some(event) = self.reconcile(now, sink) {
            return event;
        }

        match self.phase() {
            TimerPhase::Running => TimerEvent::Unchanged,
            TimerPhase::Paused => self.resume(now),
            TimerPhase::Idle => {
                if self.state.time_left_seconds == 0 {
                    self.state.time_left_seconds = self.state.planned_duration_seconds;
                }
                if self.state.session_start_time.is_none() {
                    self.state.session_start_time = Some(now);
                }
                self.state.is_active = true;
                self.state.is_paused = false;
                self.state.last_update_time = now;
                self.persist();

                info!(
                    "Focus timer started: {}s of {}s",
                    self.state.time_left_seconds, self.state.planned_duration_seconds
                );
                TimerEvent::Started
            }
        }
    }

    pub fn pause_resume(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> TimerEvent {
        if let Some(event) = self.reconcile(now, sink) {
            return event;
        }

        match self.phase() {
            TimerPhase::Idle => TimerEvent::Unchanged,
            TimerPhase::Paused => self.resume(now),
            TimerPhase::Running => {
                self.state.time_left_seconds = self.state.effective_time_left(now);
                self.state.is_paused = true;
                self.state.last_update_time = now;
                self.persist();

                info!("Focus timer paused with {}s left", self.state.time_left_seconds);
                TimerEvent::Paused
            }
        }
    }

    fn resume(&mut self, now: DateTime<Utc>) -> TimerEvent {
        self.state.is_paused = false;
        self.state.last_update_time = now;
        self.persist();

        info!("Focus timer resumed with {}s left", self.state.time_left_seconds);
        TimerEvent::Resumed
    }

    pub fn reset(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> TimerEvent {
        if let Some(event) = self.reconcile(now, sink) {
            return event;
        }

        let event = match (self.state.is_active, self.state.session_start_time) {
            (true, Some(start_time)) => {
                let elapsed = self.state.elapsed_focus_seconds(now);
                if elapsed > 0 {
                    let run = SessionInput {
                        duration: elapsed,
                        start_time,
                        end_time: Some(now),
                        completed: false,
                        task_id: None,
                    };
                    sink.record_run(run.clone());
                    info!("Focus timer reset after {}s, recorded as incomplete", elapsed);
                    TimerEvent::Abandoned(run)
                } else {
                    TimerEvent::Cleared
                }
            }
            _ => TimerEvent::Cleared,
        };

        self.fold_to_idle(now);
        event
    }

    /// Change the planned duration; only allowed while idle.
    ///
    /// A run that ran out since the last read is completed first and the new
    /// duration still applies; the completion is what gets reported.
    pub fn set_duration(
        &mut self,
        minutes: u64,
        now: DateTime<Utc>,
        sink: &mut dyn SessionSink,
    ) -> Result<TimerEvent, ValidationError> {
        self.bounds.check(minutes)?;
        let completed = self.reconcile(now, sink);

        if self.phase() != TimerPhase::Idle {
            return Err(ValidationError::TimerBusy);
        }

        let seconds = minutes * 60;
        self.state.planned_duration_seconds = seconds;
        self.state.time_left_seconds = seconds;
        self.state.last_update_time = now;
        debug!("Focus timer duration set to {} minutes", minutes);
        Ok(completed.unwrap_or(TimerEvent::DurationChanged(seconds)))
    }

    /// Advance a running countdown by the whole seconds elapsed since the
    /// last update. `last_update_time` moves by exactly the seconds consumed
    /// so a fractional remainder carries over to the next tick.
    pub fn tick(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> TimerEvent {
        if !self.state.is_running() {
            return TimerEvent::Unchanged;
        }
        if let Some(event) = self.reconcile(now, sink) {
            return event;
        }

        let consumed = self.state.whole_seconds_since_update(now);
        if consumed == 0 {
            return TimerEvent::Unchanged;
        }

        self.state.time_left_seconds -= consumed;
        self.state.last_update_time += Duration::seconds(consumed as i64);
        self.persist();
        TimerEvent::Ticked(self.state.time_left_seconds)
    }

    /// Complete a running timer whose effective time left reached zero
    fn reconcile(&mut self, now: DateTime<Utc>, sink: &mut dyn SessionSink) -> Option<TimerEvent> {
        if !self.state.is_running() || self.state.effective_time_left(now) > 0 {
            return None;
        }

        let end_time = self.state.projected_end();
        let planned = self.state.planned_duration_seconds;
        let start_time = self.state.session_start_time.unwrap_or_else(|| {
            let span = Duration::seconds(planned.min(MAX_PLANNED_SECONDS) as i64);
            end_time.checked_sub_signed(span).unwrap_or(end_time)
        });

        let run = SessionInput {
            duration: planned,
            start_time,
            end_time: Some(end_time),
            completed: true,
            task_id: None,
        };

        // Record before clearing: a crash in between replays the completion,
        // and the sink drops the duplicate.
        sink.record_run(run.clone());
        info!(
            "Focus session completed: {} started at {} (ended {})",
            format_duration(planned),
            start_time,
            end_time
        );

        self.fold_to_idle(now);
        Some(TimerEvent::Completed(run))
    }

    fn fold_to_idle(&mut self, now: DateTime<Utc>) {
        self.state = TimerSnapshot::idle(self.state.planned_duration_seconds, now);
        // Failures are logged and recorded by the store
        let _ = self.store.remove(StorageKey::TimerState);
    }

    fn persist(&self) {
        let _ = self.store.set(StorageKey::TimerState, &self.state);
    }
}

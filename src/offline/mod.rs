//! Offline action queue
//!
//! While the connectivity flag reports offline, every data mutation is also
//! appended to the persisted `memphis_offline_actions` queue and a replay tag
//! is registered with the sync facility. There is no remote side: the local
//! collections are already canonical, so a replay checks each queued entry
//! against them, logs the outcome and drains the queue.

mod sync;

pub use sync::{
    create_channel, ChannelSyncRegistrar, NoopSyncRegistrar, SyncRegistrar, SyncScope,
    SyncTagReceiver, SyncTagSender, BACKGROUND_SYNC_TAG,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{DailyGoal, FocusSession, Task, TaskId};
use crate::store::{PersistentStore, StorageKey, WarningSource};

/// Collection a mutation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTopic {
    Tasks,
    Sessions,
    Goals,
}

impl SyncTopic {
    pub const ALL: [SyncTopic; 3] = [SyncTopic::Tasks, SyncTopic::Sessions, SyncTopic::Goals];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTopic::Tasks => "tasks",
            SyncTopic::Sessions => "sessions",
            SyncTopic::Goals => "goals",
        }
    }

    /// Replay tag registered for this topic
    pub fn tag(&self) -> String {
        format!("sync-{}", self.as_str())
    }
}

/// A data mutation as it was applied locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "camelCase")]
pub enum Mutation {
    AddTask(Task),
    /// The task as it stood after the update
    UpdateTask(Task),
    DeleteTask { id: TaskId },
    ToggleTask { id: TaskId, completed: bool },
    AddSession(FocusSession),
    SetGoal(DailyGoal),
}

impl Mutation {
    pub fn topic(&self) -> SyncTopic {
        match self {
            Mutation::AddTask(_)
            | Mutation::UpdateTask(_)
            | Mutation::DeleteTask { .. }
            | Mutation::ToggleTask { .. } => SyncTopic::Tasks,
            Mutation::AddSession(_) => SyncTopic::Sessions,
            Mutation::SetGoal(_) => SyncTopic::Goals,
        }
    }
}

/// Record persisted in the offline queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action: SyncTopic,
    pub payload: Mutation,
    pub timestamp: DateTime<Utc>,
}

/// How a queued entry compares with the current collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplayOutcome {
    /// The collections still reflect the mutation
    Confirmed,
    /// A later change replaced what the mutation wrote
    Superseded,
}

/// Result of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub confirmed: usize,
    pub superseded: usize,
    /// Entries outside the replayed scope, still queued
    pub remaining: usize,
}

impl ReplayReport {
    pub fn replayed(&self) -> usize {
        self.confirmed + self.superseded
    }
}

/// Persisted queue plus the connectivity flag
#[derive(Debug)]
pub struct OfflineQueue {
    store: PersistentStore,
    registrar: Arc<dyn SyncRegistrar>,
    entries: Vec<QueuedAction>,
    online: bool,
}

impl OfflineQueue {
    /// Load queued entries; connectivity starts online until told otherwise
    pub fn load(store: PersistentStore, registrar: Arc<dyn SyncRegistrar>) -> Self {
        let entries: Vec<QueuedAction> = store.get_or_default(StorageKey::OfflineActions);
        if !entries.is_empty() {
            info!("{} offline actions waiting for replay", entries.len());
        }
        Self {
            store,
            registrar,
            entries,
            online: true,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn entries(&self) -> &[QueuedAction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a connectivity event. Coming back online with queued entries
    /// registers a full background replay. Returns whether the flag changed.
    pub fn set_online(&mut self, online: bool) -> bool {
        if self.online == online {
            return false;
        }
        self.online = online;
        info!("Connectivity changed: {}", if online { "online" } else { "offline" });

        if online && !self.entries.is_empty() {
            self.register(BACKGROUND_SYNC_TAG);
        }
        true
    }

    /// Queue a mutation if offline. Returns whether it was queued.
    pub fn record(&mut self, mutation: Mutation, now: DateTime<Utc>) -> bool {
        if self.online {
            return false;
        }

        let topic = mutation.topic();
        self.entries.push(QueuedAction {
            action: topic,
            payload: mutation,
            timestamp: now,
        });
        self.persist();
        debug!("Queued offline {} mutation ({} pending)", topic.as_str(), self.entries.len());

        self.register(&topic.tag());
        true
    }

    /// Check queued entries in scope against the persisted collections and
    /// drain them
    pub fn replay(&mut self, scope: SyncScope) -> ReplayReport {
        let snapshot = PersistedState::read(&self.store);
        let mut report = ReplayReport::default();

        self.entries.retain(|entry| {
            if !scope.covers(entry.action) {
                report.remaining += 1;
                return true;
            }
            match snapshot.classify(&entry.payload) {
                ReplayOutcome::Confirmed => report.confirmed += 1,
                ReplayOutcome::Superseded => {
                    debug!(
                        "Offline {} mutation from {} was superseded",
                        entry.action.as_str(),
                        entry.timestamp
                    );
                    report.superseded += 1;
                }
            }
            false
        });

        if report.replayed() > 0 {
            self.persist();
            info!(
                "Replayed {} offline actions: {} confirmed, {} superseded, {} remaining",
                report.replayed(),
                report.confirmed,
                report.superseded,
                report.remaining
            );
        }
        report
    }

    fn register(&self, tag: &str) {
        if let Err(e) = self.registrar.register(tag) {
            warn!("Failed to register sync tag {}: {}", tag, e);
            self.store
                .warnings()
                .push(WarningSource::SyncRegistration, tag, e.to_string());
        }
    }

    fn persist(&self) {
        let _ = self.store.set(StorageKey::OfflineActions, &self.entries);
    }
}

/// Collections as currently persisted, read once per replay
struct PersistedState {
    tasks: Vec<Task>,
    sessions: Vec<FocusSession>,
    goals: Vec<DailyGoal>,
}

impl PersistedState {
    fn read(store: &PersistentStore) -> Self {
        Self {
            tasks: store.get_or_default(StorageKey::Tasks),
            sessions: store.get_or_default(StorageKey::Sessions),
            goals: store.get_or_default(StorageKey::Goals),
        }
    }

    fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn classify(&self, mutation: &Mutation) -> ReplayOutcome {
        let confirmed = match mutation {
            Mutation::AddTask(task) | Mutation::UpdateTask(task) => self.task(&task.id) == Some(task),
            Mutation::DeleteTask { id } => self.task(id).is_none(),
            Mutation::ToggleTask { id, completed } => {
                self.task(id).is_some_and(|t| t.completed == *completed)
            }
            Mutation::AddSession(session) => self.sessions.iter().any(|s| s.id == session.id),
            Mutation::SetGoal(goal) => self.goals.iter().any(|g| g == goal),
        };
        if confirmed {
            ReplayOutcome::Confirmed
        } else {
            ReplayOutcome::Superseded
        }
    }
}

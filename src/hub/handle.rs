//! Shared handle to the hub, the ticker task and view observers
//!
//! The handle serializes all access behind one mutex. After every call it
//! publishes the reconciled `TimerView` to watchers and starts or stops the
//! ticker so it only exists while the countdown is running. Publishing
//! happens under the hub lock, so views reach watchers in the order the hub
//! produced them. Lock order is hub, then ticker.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::offline::{ReplayReport, SyncScope, SyncTagReceiver};
use crate::timer::{TimerPhase, TimerView};

use super::FocusHub;

struct Shared {
    hub: Mutex<FocusHub>,
    views: watch::Sender<TimerView>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
}

/// Cloneable handle shared by every surface
#[derive(Clone)]
pub struct HubHandle {
    shared: Arc<Shared>,
}

impl HubHandle {
    /// Wrap a hub. Must be called within a tokio runtime: a timer restored
    /// in the running phase gets its ticker right away.
    pub fn new(mut hub: FocusHub, tick_interval: Duration) -> Self {
        let view = hub.timer_view();
        let (views, _) = watch::channel(view.clone());

        let handle = Self {
            shared: Arc::new(Shared {
                hub: Mutex::new(hub),
                views,
                ticker: Mutex::new(None),
                tick_interval: tick_interval.max(Duration::from_millis(1)),
            }),
        };
        handle.sync_ticker(view.phase);
        handle
    }

    /// Run a (possibly mutating) operation, then publish the timer view
    pub fn with_hub<R>(&self, operation: impl FnOnce(&mut FocusHub) -> R) -> R {
        let mut hub = self.lock();
        let result = operation(&mut hub);
        self.publish(hub.timer_view());
        result
    }

    /// Run a read-only query
    pub fn read<R>(&self, query: impl FnOnce(&FocusHub) -> R) -> R {
        query(&self.lock())
    }

    /// Observe timer views; a new value arrives whenever the display changes
    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.shared.views.subscribe()
    }

    /// Whether a ticker task is currently live
    pub fn ticker_running(&self) -> bool {
        self.lock_ticker()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Handle a sync tag fired by the sync facility or a collaborator
    pub fn fire_sync(&self, tag: &str) -> Option<ReplayReport> {
        let Some(scope) = SyncScope::from_tag(tag) else {
            warn!("Ignoring unknown sync tag {}", tag);
            return None;
        };
        self.with_hub(|hub| hub.replay(scope))
    }

    /// Stop the ticker; used on shutdown
    pub fn stop(&self) {
        if let Some(task) = self.lock_ticker().take() {
            task.abort();
        }
    }

    /// One ticker step. Returns whether the countdown is still running.
    fn tick(&self) -> bool {
        let mut hub = self.lock();
        hub.tick();
        let view = hub.timer_view();
        let running = view.phase == TimerPhase::Running;
        self.publish(view);
        running
    }

    fn publish(&self, view: TimerView) {
        let phase = view.phase;
        self.shared.views.send_if_modified(|current| {
            if current.same_display(&view) {
                false
            } else {
                *current = view;
                true
            }
        });
        self.sync_ticker(phase);
    }

    /// Spawn the ticker when running, abort it otherwise
    fn sync_ticker(&self, phase: TimerPhase) {
        let mut ticker = self.lock_ticker();
        match phase {
            TimerPhase::Running => {
                if ticker.as_ref().map_or(true, |task| task.is_finished()) {
                    debug!("Starting timer ticker");
                    *ticker = Some(self.spawn_ticker());
                }
            }
            TimerPhase::Idle | TimerPhase::Paused => {
                if let Some(task) = ticker.take() {
                    debug!("Stopping timer ticker");
                    task.abort();
                }
            }
        }
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let period = self.shared.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if !(HubHandle { shared }).tick() {
                    break;
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, FocusHub> {
        self.shared
            .hub
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.shared
            .ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drain sync tags and replay each one against the hub
pub fn spawn_sync_worker(handle: HubHandle, mut tags: SyncTagReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(tag) = tags.recv().await {
            debug!("Sync tag fired: {}", tag);
            if let Some(report) = handle.fire_sync(&tag) {
                if report.replayed() > 0 {
                    info!(
                        "Sync {} confirmed {} and superseded {} offline actions",
                        tag, report.confirmed, report.superseded
                    );
                }
            }
        }
        debug!("Sync worker stopped");
    })
}

//! Background replay registration
//!
//! Registering a tag asks the sync facility to run a replay later. The
//! facility is best-effort: the queue is the durable record, so a tag that
//! never fires only delays the consistency check.

use std::fmt::Debug;

use tokio::sync::mpsc;

use crate::error::SyncError;

use super::SyncTopic;

/// Tag registered on reconnect; replays every topic
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Sender half of the sync tag channel
pub type SyncTagSender = mpsc::Sender<String>;

/// Receiver half of the sync tag channel
pub type SyncTagReceiver = mpsc::Receiver<String>;

/// Create a bounded channel for sync tags
pub fn create_channel(buffer: usize) -> (SyncTagSender, SyncTagReceiver) {
    mpsc::channel(buffer.max(1))
}

/// Which queued entries a sync tag covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Topic(SyncTopic),
}

impl SyncScope {
    /// Parse `background-sync` or `sync-<topic>`
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag == BACKGROUND_SYNC_TAG {
            return Some(SyncScope::All);
        }
        let topic = tag.strip_prefix("sync-")?;
        SyncTopic::ALL
            .into_iter()
            .find(|t| t.as_str() == topic)
            .map(SyncScope::Topic)
    }

    pub fn covers(&self, topic: SyncTopic) -> bool {
        match self {
            SyncScope::All => true,
            SyncScope::Topic(t) => *t == topic,
        }
    }
}

/// Platform facility that fires replay tags when connectivity allows
pub trait SyncRegistrar: Send + Sync + Debug {
    fn register(&self, tag: &str) -> Result<(), SyncError>;
}

/// Registrar that forwards tags to the sync worker over a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSyncRegistrar {
    sender: SyncTagSender,
}

impl ChannelSyncRegistrar {
    pub fn new(sender: SyncTagSender) -> Self {
        Self { sender }
    }
}

impl SyncRegistrar for ChannelSyncRegistrar {
    fn register(&self, tag: &str) -> Result<(), SyncError> {
        match self.sender.try_send(tag.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(tag)) => Err(SyncError::ChannelFull(tag)),
            Err(mpsc::error::TrySendError::Closed(tag)) => Err(SyncError::Closed(tag)),
        }
    }
}

/// Registrar for hosts without a sync facility; replays only happen when
/// a collaborator fires a tag directly
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSyncRegistrar;

impl SyncRegistrar for NoopSyncRegistrar {
    fn register(&self, _tag: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

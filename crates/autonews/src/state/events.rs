//! Change notifications for processing state observers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::entry::ProcessingEntry;

/// Emitted by the processing store whenever its state changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessingEvent {
    /// An entry was created or changed.
    Updated {
        record_id: u64,
        entry: ProcessingEntry,
    },
    /// A run finished successfully and its entry was cleared.
    Removed { record_id: u64 },
    /// A message that must be brought to the operator's attention.
    Alert {
        #[serde(skip_serializing_if = "Option::is_none")]
        record_id: Option<u64>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProcessingEvent {
    pub fn alert(record_id: Option<u64>, message: &str) -> Self {
        ProcessingEvent::Alert {
            record_id,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn record_id(&self) -> Option<u64> {
        match self {
            ProcessingEvent::Updated { record_id, .. } | ProcessingEvent::Removed { record_id } => {
                Some(*record_id)
            }
            ProcessingEvent::Alert { record_id, .. } => *record_id,
        }
    }
}

/// Fan-out of processing events to any number of subscribers.
#[derive(Clone)]
pub struct ProcessingBroadcaster {
    sender: Arc<broadcast::Sender<ProcessingEvent>>,
}

impl ProcessingBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: ProcessingEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProcessingBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

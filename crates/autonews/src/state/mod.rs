//! Processing state: live run entries, their persistence, change events,
//! the elapsed ticker and startup recovery.

pub mod backend;
pub mod entry;
pub mod events;
pub mod recovery;
pub mod store;
mod ticker;

pub use backend::{FileBackend, MemoryBackend, StateBackend};
pub use entry::{ProcessingEntry, ProcessingMap, ProcessingStatus};
pub use events::{ProcessingBroadcaster, ProcessingEvent};
pub use recovery::{RecoveryAction, RecoveryPolicy, RestartPolicy};
pub use store::{now_ms, ProcessingStore, MIN_TICK_INTERVAL};

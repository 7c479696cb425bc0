//! Processing state store: the single owner of live run entries.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::language::LanguageCode;

use super::backend::StateBackend;
use super::entry::{ProcessingEntry, ProcessingMap, ProcessingStatus};
use super::events::{ProcessingBroadcaster, ProcessingEvent};
use super::ticker;

/// Shortest elapsed ticker period; shorter ones are raised to this.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Wall-clock epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct Inner {
    entries: ProcessingMap,
    ticker_active: bool,
}

/// Record id to run entry map, persisted after every change.
///
/// Uses `std::sync::RwLock`; no lock is ever held across an `.await`.
pub struct ProcessingStore {
    inner: RwLock<Inner>,
    backend: Box<dyn StateBackend>,
    events: ProcessingBroadcaster,
    tick_interval: Duration,
}

impl ProcessingStore {
    /// Rehydrates from `backend`. Unreadable state is logged and replaced by
    /// an empty map. If running entries were loaded and a tokio runtime is
    /// available, the elapsed ticker starts immediately.
    pub fn new(backend: Box<dyn StateBackend>, tick_interval: Duration) -> Arc<Self> {
        if tick_interval < MIN_TICK_INTERVAL {
            log::warn!(
                "Tick interval {:?} is too short, using {:?}",
                tick_interval,
                MIN_TICK_INTERVAL
            );
        }
        let tick_interval = tick_interval.max(MIN_TICK_INTERVAL);

        let entries = match backend.load() {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to load processing state, starting empty: {}", e);
                ProcessingMap::new()
            }
        };

        let running = entries.values().filter(|e| e.is_running()).count();
        if !entries.is_empty() {
            log::info!(
                "Loaded {} processing entries ({} running)",
                entries.len(),
                running
            );
        }

        let store = Arc::new(Self {
            inner: RwLock::new(Inner {
                entries,
                ticker_active: false,
            }),
            backend,
            events: ProcessingBroadcaster::default(),
            tick_interval,
        });
        store.ensure_ticker();
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Processing store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Processing store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn persist(&self, entries: &ProcessingMap) {
        if let Err(e) = self.backend.save(entries) {
            log::error!("Failed to persist processing state: {}", e);
        }
    }

    /// Applies `mutate` to the entry for `record_id`, persists, and notifies.
    /// Returns the updated entry, or `None` when there was nothing to update.
    fn update_entry<F>(&self, record_id: u64, mutate: F) -> Option<ProcessingEntry>
    where
        F: FnOnce(&mut ProcessingEntry),
    {
        let updated = {
            let mut inner = self.write();
            let entry = inner.entries.get_mut(&record_id)?;
            mutate(entry);
            let updated = entry.clone();
            self.persist(&inner.entries);
            updated
        };

        self.events.send(ProcessingEvent::Updated {
            record_id,
            entry: updated.clone(),
        });
        Some(updated)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ProcessingMap {
        self.read().entries.clone()
    }

    pub fn get(&self, record_id: u64) -> Option<ProcessingEntry> {
        self.read().entries.get(&record_id).cloned()
    }

    pub fn is_running(&self, record_id: u64) -> bool {
        self.read()
            .entries
            .get(&record_id)
            .is_some_and(|e| e.is_running())
    }

    pub fn running_ids(&self) -> Vec<u64> {
        self.read()
            .entries
            .iter()
            .filter(|(_, e)| e.is_running())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Records a fresh running entry, replacing any previous one for the id.
    pub fn begin(
        self: &Arc<Self>,
        record_id: u64,
        language: LanguageCode,
        step_label: Option<String>,
    ) -> ProcessingEntry {
        let entry = ProcessingEntry::running(language, now_ms(), step_label);
        {
            let mut inner = self.write();
            inner.entries.insert(record_id, entry.clone());
            self.persist(&inner.entries);
        }

        self.events.send(ProcessingEvent::Updated {
            record_id,
            entry: entry.clone(),
        });
        self.ensure_ticker();
        entry
    }

    pub fn set_step(&self, record_id: u64, step_label: &str) -> Option<ProcessingEntry> {
        self.update_entry(record_id, |entry| {
            entry.step_label = Some(step_label.to_string());
        })
    }

    /// Marks the run as failed, freezing elapsed time at the moment of failure.
    pub fn fail(&self, record_id: u64, message: &str) -> Option<ProcessingEntry> {
        let now = now_ms();
        self.update_entry(record_id, |entry| {
            entry.refresh_elapsed(now);
            entry.status = ProcessingStatus::Error;
            entry.error = Some(message.to_string());
        })
    }

    /// Clears the entry for a finished run.
    pub fn remove(&self, record_id: u64) -> Option<ProcessingEntry> {
        let removed = {
            let mut inner = self.write();
            let removed = inner.entries.remove(&record_id)?;
            self.persist(&inner.entries);
            removed
        };

        self.events.send(ProcessingEvent::Removed { record_id });
        Some(removed)
    }

    /// Surfaces a message to observers without touching any entry.
    pub fn alert(&self, record_id: Option<u64>, message: &str) {
        match record_id {
            Some(id) => log::warn!("Record {}: {}", id, message),
            None => log::warn!("{}", message),
        }
        self.events.send(ProcessingEvent::alert(record_id, message));
    }

    /// Recomputes elapsed time of every running entry against `now`.
    ///
    /// Returns `false` once nothing is running; the ticker is then considered
    /// stopped and will be re-armed by the next [`begin`](Self::begin).
    pub fn tick_at(&self, now: i64) -> bool {
        let (changed, still_running) = {
            let mut inner = self.write();
            let mut changed = Vec::new();
            for (id, entry) in inner.entries.iter_mut().filter(|(_, e)| e.is_running()) {
                let before = entry.elapsed_ms;
                entry.refresh_elapsed(now);
                if entry.elapsed_ms != before {
                    changed.push((*id, entry.clone()));
                }
            }

            let still_running = inner.entries.values().any(|e| e.is_running());
            if !still_running {
                inner.ticker_active = false;
            }
            if !changed.is_empty() {
                self.persist(&inner.entries);
            }
            (changed, still_running)
        };

        for (record_id, entry) in changed {
            self.events.send(ProcessingEvent::Updated { record_id, entry });
        }
        still_running
    }

    pub fn is_ticking(&self) -> bool {
        self.read().ticker_active
    }

    /// Starts the shared elapsed ticker if something is running and no ticker
    /// is active.
    pub fn ensure_ticker(self: &Arc<Self>) {
        let should_start = {
            let mut inner = self.write();
            if inner.ticker_active || !inner.entries.values().any(|e| e.is_running()) {
                false
            } else {
                inner.ticker_active = true;
                true
            }
        };

        if !should_start {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::debug!("Starting elapsed ticker every {:?}", self.tick_interval);
                handle.spawn(ticker::run(Arc::downgrade(self), self.tick_interval));
            }
            Err(_) => {
                log::debug!("No tokio runtime, elapsed ticker not started");
                self.write().ticker_active = false;
            }
        }
    }
}

//! Durable storage for the processing map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StateError;

use serde_json::Value;

use super::entry::{ProcessingEntry, ProcessingMap};

/// Where the processing map lives between process lifetimes.
pub trait StateBackend: Send + Sync {
    /// Reads the persisted map. Absent state is an empty map, not an error.
    fn load(&self) -> Result<ProcessingMap, StateError>;

    /// Replaces the persisted map.
    fn save(&self, map: &ProcessingMap) -> Result<(), StateError>;
}

impl<T: StateBackend + ?Sized> StateBackend for Arc<T> {
    fn load(&self) -> Result<ProcessingMap, StateError> {
        (**self).load()
    }

    fn save(&self, map: &ProcessingMap) -> Result<(), StateError> {
        (**self).save(map)
    }
}

/// Decodes a persisted map entry by entry. Entries with a bad key or shape
/// are skipped so one of them cannot take the others down; only JSON that is
/// not an object at all is an error.
pub fn decode_map(json: &str) -> Result<ProcessingMap, StateError> {
    let raw: BTreeMap<String, Value> = serde_json::from_str(json)?;
    let mut map = ProcessingMap::new();

    for (key, value) in raw {
        let Ok(record_id) = key.trim().parse::<u64>() else {
            log::warn!("Skipping processing entry with invalid record id '{}'", key);
            continue;
        };
        match serde_json::from_value::<ProcessingEntry>(value) {
            Ok(entry) => {
                map.insert(record_id, entry);
            }
            Err(e) => log::warn!("Skipping malformed processing entry {}: {}", record_id, e),
        }
    }

    Ok(map)
}

/// Single JSON file, replaced atomically on every save.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateBackend for FileBackend {
    fn load(&self) -> Result<ProcessingMap, StateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProcessingMap::new());
            }
            Err(e) => {
                return Err(StateError::ReadFile {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(ProcessingMap::new());
        }

        decode_map(&content)
    }

    fn save(&self, map: &ProcessingMap) -> Result<(), StateError> {
        let write_err = |source| StateError::WriteFile {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// In-process backend holding the serialized map, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryBackend {
    snapshot: Mutex<Option<String>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously persisted JSON, as if written by an earlier process.
    pub fn with_snapshot(json: impl Into<String>) -> Self {
        Self {
            snapshot: Mutex::new(Some(json.into())),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<ProcessingMap, StateError> {
        match self.snapshot() {
            Some(json) => decode_map(&json),
            None => Ok(ProcessingMap::new()),
        }
    }

    fn save(&self, map: &ProcessingMap) -> Result<(), StateError> {
        let json = serde_json::to_string(map)?;
        *self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageCode;
    use crate::state::entry::ProcessingEntry;
    use tempfile::TempDir;

    fn sample_map() -> ProcessingMap {
        let mut map = ProcessingMap::new();
        map.insert(
            42,
            ProcessingEntry::running(LanguageCode::resolve("EN"), 1_000, None),
        );
        map
    }

    #[test]
    fn test_file_backend_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("state.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_backend_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");
        let backend = FileBackend::new(&path);

        backend.save(&sample_map()).unwrap();

        assert!(path.exists());
        assert!(!backend.temp_path().exists());
        assert_eq!(backend.load().unwrap(), sample_map());
    }

    #[test]
    fn test_file_backend_keys_are_strings() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("state.json"));
        backend.save(&sample_map()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(backend.path()).unwrap()).unwrap();
        assert_eq!(raw["42"]["status"], "running");
        assert_eq!(raw["42"]["startTime"], 1_000);
    }

    #[test]
    fn test_file_backend_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = FileBackend::new(&path).load();
        assert!(matches!(result, Err(StateError::Json(_))));
    }

    #[test]
    fn test_file_backend_skips_malformed_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "42": {"status": "running", "language": "EN", "startTime": 1000},
                "43": {"status": "paused", "startTime": 5},
                "44": "garbage",
                "abc": {"status": "running", "startTime": 7}
            }"#,
        )
        .unwrap();

        assert_eq!(FileBackend::new(&path).load().unwrap(), sample_map());
    }

    #[test]
    fn test_decode_map_rejects_non_object() {
        assert!(matches!(decode_map("[1, 2]"), Err(StateError::Json(_))));
        assert!(decode_map("{}").unwrap().is_empty());
    }

    #[test]
    fn test_memory_backend_counts_saves() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().is_empty());

        backend.save(&sample_map()).unwrap();
        backend.save(&ProcessingMap::new()).unwrap();

        assert_eq!(backend.save_count(), 2);
        assert_eq!(backend.snapshot().as_deref(), Some("{}"));
    }

    #[test]
    fn test_memory_backend_snapshot() {
        let backend =
            MemoryBackend::with_snapshot(r#"{"42": {"status": "running", "language": "EN", "startTime": 1000}}"#);
        assert_eq!(backend.load().unwrap(), sample_map());
    }
}

//! What to do with runs that were interrupted by a process exit.

use crate::language::LanguageCode;

use super::entry::ProcessingMap;

/// One run to launch on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAction {
    pub record_id: u64,
    pub language: LanguageCode,
}

/// Decides which persisted entries get a new run after a restart.
pub trait RecoveryPolicy: Send + Sync {
    fn plan(&self, entries: &ProcessingMap) -> Vec<RecoveryAction>;
}

/// Restarts every interrupted run from its first step.
///
/// Step progress is not persisted, and a half-applied step cannot be told
/// apart from a corrupt record, so the whole pipeline runs again.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestartPolicy;

impl RecoveryPolicy for RestartPolicy {
    fn plan(&self, entries: &ProcessingMap) -> Vec<RecoveryAction> {
        entries
            .iter()
            .filter(|(_, entry)| entry.is_running())
            .map(|(id, entry)| RecoveryAction {
                record_id: *id,
                language: entry.language.clone(),
            })
            .collect()
    }
}

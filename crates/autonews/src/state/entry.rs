//! Live run state for one record.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::language::LanguageCode;

/// Processing map as persisted: record id to its run entry.
pub type ProcessingMap = BTreeMap<u64, ProcessingEntry>;

/// Status of a pipeline run. A finished run has no entry at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Running,
    Error,
}

/// Progress of one record's pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEntry {
    pub status: ProcessingStatus,
    /// Wall-clock epoch milliseconds at run start.
    pub start_time: i64,
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub language: LanguageCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingEntry {
    pub fn running(language: LanguageCode, start_time: i64, step_label: Option<String>) -> Self {
        Self {
            status: ProcessingStatus::Running,
            start_time,
            elapsed_ms: 0,
            language,
            step_label,
            error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessingStatus::Running
    }

    pub fn is_error(&self) -> bool {
        self.status == ProcessingStatus::Error
    }

    /// Recomputes elapsed time against `now_ms`. Elapsed time never goes
    /// backwards, even if the wall clock does.
    pub fn refresh_elapsed(&mut self, now_ms: i64) {
        let elapsed = u64::try_from(now_ms.saturating_sub(self.start_time)).unwrap_or(0);
        self.elapsed_ms = self.elapsed_ms.max(elapsed);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Elapsed time as `MM:SS`.
    pub fn format_timer(&self) -> String {
        let total_seconds = self.elapsed_ms / 1000;
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    pub fn is_over_limit(&self, threshold: Duration) -> bool {
        self.elapsed() >= threshold
    }

    /// Share of `threshold` used so far, capped at 100.
    pub fn progress_percent(&self, threshold: Duration) -> f64 {
        let limit = threshold.as_millis();
        if limit == 0 {
            return 100.0;
        }
        let percent = self.elapsed_ms as f64 / limit as f64 * 100.0;
        percent.min(100.0)
    }
}

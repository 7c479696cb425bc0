//! Terminal rendering of processing events.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use autonews::pipeline::wait_all;
use autonews::state::ProcessingStatus;
use autonews::{ProcessingEntry, ProcessingEvent, RunHandle, RunOutcome};

/// Turns the event stream into human-readable lines, skipping timer ticks
/// that change nothing but the elapsed time.
pub struct EventRenderer {
    threshold: Duration,
    watched: Option<HashSet<u64>>,
    last_seen: HashMap<u64, (ProcessingStatus, Option<String>)>,
}

impl EventRenderer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            watched: None,
            last_seen: HashMap::new(),
        }
    }

    /// Only render events for these records. Alerts without a record id
    /// are always rendered.
    pub fn watching(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.watched = Some(ids.into_iter().collect());
        self
    }

    pub fn render(&mut self, event: &ProcessingEvent) -> Option<String> {
        if let (Some(watched), Some(id)) = (&self.watched, event.record_id()) {
            if !watched.contains(&id) {
                return None;
            }
        }

        match event {
            ProcessingEvent::Updated { record_id, entry } => {
                let key = (entry.status, entry.step_label.clone());
                if self.last_seen.get(record_id) == Some(&key) {
                    return None;
                }
                self.last_seen.insert(*record_id, key);
                Some(format!("#{} {}", record_id, describe(entry, self.threshold)))
            }
            ProcessingEvent::Removed { record_id } => {
                self.last_seen.remove(record_id);
                Some(format!("#{} done", record_id))
            }
            ProcessingEvent::Alert {
                record_id: Some(id),
                message,
                ..
            } => Some(format!("#{} ! {}", id, message)),
            ProcessingEvent::Alert { message, .. } => Some(format!("! {}", message)),
        }
    }
}

/// One-line summary of an entry: timer, language, step or error.
pub fn describe(entry: &ProcessingEntry, threshold: Duration) -> String {
    let mut line = format!("[{}] {}", entry.format_timer(), entry.language);

    match entry.status {
        ProcessingStatus::Running => {
            line.push_str(&format!(
                " {:>3.0}%",
                entry.progress_percent(threshold)
            ));
            if let Some(label) = &entry.step_label {
                line.push(' ');
                line.push_str(label);
            }
            if entry.is_over_limit(threshold) {
                line.push_str(" (slow)");
            }
        }
        ProcessingStatus::Error => {
            line.push_str(" failed: ");
            line.push_str(entry.error.as_deref().unwrap_or("unknown error"));
        }
    }

    line
}

/// Prints events for `handles` until every run has finished.
///
/// `events` must be subscribed before the runs were spawned, otherwise the
/// first step of each run is not shown.
pub async fn follow(
    mut events: Receiver<ProcessingEvent>,
    handles: Vec<RunHandle>,
    threshold: Duration,
) -> Vec<RunOutcome> {
    let mut renderer =
        EventRenderer::new(threshold).watching(handles.iter().map(RunHandle::record_id));

    let outcomes = wait_all(handles);
    tokio::pin!(outcomes);

    loop {
        tokio::select! {
            done = &mut outcomes => {
                // Drain whatever the runs emitted right before finishing.
                while let Ok(event) = events.try_recv() {
                    if let Some(line) = renderer.render(&event) {
                        println!("{}", line);
                    }
                }
                return done;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(line) = renderer.render(&event) {
                        println!("{}", line);
                    } else {
                        debug!("Skipped event {:?}", event);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Event stream lagged, missed {} events", n);
                }
                Err(RecvError::Closed) => {
                    info!("Processing store closed, waiting for runs without progress output");
                    return (&mut outcomes).await;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autonews::LanguageCode;

    const THRESHOLD: Duration = Duration::from_secs(240);

    fn running(label: &str, elapsed_ms: u64) -> ProcessingEntry {
        let mut entry =
            ProcessingEntry::running(LanguageCode::resolve("es"), 0, Some(label.to_string()));
        entry.elapsed_ms = elapsed_ms;
        entry
    }

    #[test]
    fn test_describe_running() {
        let line = describe(&running("Step 1/4 (ES): text preparation", 60_000), THRESHOLD);
        assert_eq!(line, "[01:00] ES  25% Step 1/4 (ES): text preparation");
    }

    #[test]
    fn test_describe_slow_and_failed() {
        let slow = running("Step 3/4 (ES): revision", 300_000);
        assert!(describe(&slow, THRESHOLD).ends_with("(slow)"));

        let mut failed = running("Step 3/4 (ES): revision", 5_000);
        failed.status = ProcessingStatus::Error;
        failed.error = Some("Step 3/4 (ES): revision failed: boom".to_string());
        assert_eq!(
            describe(&failed, THRESHOLD),
            "[00:05] ES failed: Step 3/4 (ES): revision failed: boom"
        );
    }

    #[test]
    fn test_renderer_skips_timer_only_updates() {
        let mut renderer = EventRenderer::new(THRESHOLD);
        let first = ProcessingEvent::Updated {
            record_id: 3,
            entry: running("Step 1/2 (ES): a", 1_000),
        };
        let tick = ProcessingEvent::Updated {
            record_id: 3,
            entry: running("Step 1/2 (ES): a", 2_000),
        };
        let next = ProcessingEvent::Updated {
            record_id: 3,
            entry: running("Step 2/2 (ES): b", 3_000),
        };

        assert!(renderer.render(&first).is_some());
        assert!(renderer.render(&tick).is_none());
        assert!(renderer.render(&next).is_some());
        assert_eq!(
            renderer.render(&ProcessingEvent::Removed { record_id: 3 }),
            Some("#3 done".to_string())
        );
    }

    #[test]
    fn test_renderer_filters_unwatched_records() {
        let mut renderer = EventRenderer::new(THRESHOLD).watching([1]);

        assert!(renderer
            .render(&ProcessingEvent::Removed { record_id: 2 })
            .is_none());
        assert_eq!(
            renderer.render(&ProcessingEvent::alert(None, "config reloaded")),
            Some("! config reloaded".to_string())
        );
        assert_eq!(
            renderer.render(&ProcessingEvent::alert(Some(1), "boom")),
            Some("#1 ! boom".to_string())
        );
    }
}

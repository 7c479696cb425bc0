//! Operator-facing inbox actions: listing, creating and (re)starting
//! translations.

use serde_json::Value;

use crate::api::{InboxPage, InboxQuery, NewTranslationRecord};
use crate::error::{ApiError, AutonewsError, Result};
use crate::language::{LanguageCode, SOURCE_LANGUAGE};
use crate::pipeline::{Orchestrator, PipelineError, RunHandle, RunOptions, RunTarget};
use crate::record::{RecordStatus, TranslationRecord};
use crate::state::ProcessingEntry;

/// Largest page the backend is asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Operator input for a new inbox record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub body_raw: String,
    pub notes: Option<String>,
}

/// Result of [`InboxService::create`].
pub struct CreatedRecord {
    pub id: Option<u64>,
    pub record: Option<TranslationRecord>,
    /// Present when a translation was started right away.
    pub run: Option<RunHandle>,
}

pub struct InboxService {
    orchestrator: Orchestrator,
}

impl InboxService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Newest records first. `page_size` is clamped to `1..=100`.
    pub async fn list(&self, page: u32, page_size: u32) -> Result<InboxPage> {
        let query = InboxQuery {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            ..InboxQuery::default()
        };
        Ok(self.orchestrator.api().list_inbox(&query).await?)
    }

    pub async fn get(&self, id: u64) -> Result<TranslationRecord> {
        Ok(self.orchestrator.api().fetch_record(id).await?)
    }

    /// Creates a record and, with `auto_translate`, starts its translation.
    pub async fn create(
        &self,
        draft: RecordDraft,
        auto_translate: Option<&str>,
    ) -> Result<CreatedRecord> {
        if draft.body_raw.trim().is_empty() {
            return Err(AutonewsError::InvalidInput(
                "Record text must not be empty".to_string(),
            ));
        }

        let language = auto_translate.map(LanguageCode::resolve);
        let target_language = language
            .clone()
            .unwrap_or_else(|| self.orchestrator.default_language().clone());

        let request = NewTranslationRecord {
            source_language: SOURCE_LANGUAGE.to_string(),
            target_language: target_language.into(),
            body_raw: draft.body_raw,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
        };

        let api = self.orchestrator.api();
        let response = api.create_record(&request).await?;
        let id = created_id(&response);
        log::info!("Created inbox record {:?}", id);

        let Some(language) = language else {
            return Ok(CreatedRecord {
                id,
                record: embedded_record(&response),
                run: None,
            });
        };

        let record = match (embedded_record(&response), id) {
            (Some(record), _) => record,
            (None, Some(id)) => api.fetch_record(id).await?,
            (None, None) => {
                return Err(ApiError::MissingRecordId {
                    path: "/translations/inbox".to_string(),
                }
                .into())
            }
        };

        let run = self
            .orchestrator
            .spawn(RunTarget::from(record.clone()), RunOptions::from(language));

        Ok(CreatedRecord {
            id: Some(record.id),
            record: Some(record),
            run: Some(run),
        })
    }

    /// Resets a record to `new` and translates it again from the first step.
    pub async fn retranslate(&self, id: u64, language: Option<&str>) -> Result<RunHandle> {
        if self.orchestrator.is_busy(id) {
            return Err(PipelineError::AlreadyRunning(id).into());
        }

        let api = self.orchestrator.api();
        api.update_status(id, RecordStatus::New).await?;
        let record = api.fetch_record(id).await?;

        let language = language
            .map(LanguageCode::resolve)
            .unwrap_or_else(|| self.orchestrator.default_language().clone());

        Ok(self
            .orchestrator
            .spawn(RunTarget::from(record), RunOptions::from(language)))
    }

    /// Whether the operator may start a run for `record` right now.
    pub fn can_start(record: &TranslationRecord, entry: Option<&ProcessingEntry>) -> bool {
        if entry.is_some_and(ProcessingEntry::is_running) {
            return false;
        }
        record.status != RecordStatus::Processed
    }

    /// Status to show for a record, letting live run state win over a
    /// possibly stale server status.
    pub fn effective_status(
        record: &TranslationRecord,
        entry: Option<&ProcessingEntry>,
    ) -> RecordStatus {
        match entry {
            Some(entry) if entry.is_running() => RecordStatus::Processed,
            Some(entry) if entry.is_error() => RecordStatus::Failed,
            _ => record.status,
        }
    }
}

/// The creation response may be the record itself, `{id}` or `{record}`.
fn created_id(response: &Value) -> Option<u64> {
    response
        .get("id")
        .and_then(Value::as_u64)
        .or_else(|| response.get("record")?.get("id")?.as_u64())
}

fn embedded_record(response: &Value) -> Option<TranslationRecord> {
    let record = response.get("record").filter(|r| r.is_object())?;
    match serde_json::from_value(record.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("Ignoring malformed record in creation response: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_id_shapes() {
        assert_eq!(created_id(&json!({"id": 5, "body_raw": "x"})), Some(5));
        assert_eq!(created_id(&json!({"record": {"id": 6}})), Some(6));
        assert_eq!(created_id(&json!({"ok": true})), None);
        assert_eq!(created_id(&json!("created")), None);
    }

    #[test]
    fn test_embedded_record() {
        let record = embedded_record(&json!({"record": {"id": 6, "body_raw": "text"}})).unwrap();
        assert_eq!(record.id, 6);
        assert!(embedded_record(&json!({"id": 6})).is_none());
        assert!(embedded_record(&json!({"record": {"body_raw": "no id"}})).is_none());
    }

    #[test]
    fn test_can_start() {
        let mut record = TranslationRecord::new(1, "x");
        assert!(InboxService::can_start(&record, None));

        record.status = RecordStatus::Processed;
        assert!(!InboxService::can_start(&record, None));

        record.status = RecordStatus::Failed;
        assert!(InboxService::can_start(&record, None));

        let running = ProcessingEntry::running(LanguageCode::default(), 0, None);
        assert!(!InboxService::can_start(&record, Some(&running)));
    }

    #[test]
    fn test_effective_status() {
        let record = TranslationRecord::new(1, "x");
        let mut entry = ProcessingEntry::running(LanguageCode::default(), 0, None);
        assert_eq!(
            InboxService::effective_status(&record, Some(&entry)),
            RecordStatus::Processed
        );

        entry.status = crate::state::ProcessingStatus::Error;
        assert_eq!(
            InboxService::effective_status(&record, Some(&entry)),
            RecordStatus::Failed
        );
        assert_eq!(InboxService::effective_status(&record, None), RecordStatus::New);
    }
}

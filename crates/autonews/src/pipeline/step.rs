use serde_json::Value;

use crate::api::{ReasoningEffort, StepRequest, TranslationApi};
use crate::error::ApiError;
use crate::language::LanguageCode;
use crate::locale;
use crate::record::TranslationRecord;

/// Which backend endpoint a step calls and how its response is folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Normalizes the raw body; response carries `body_prepared`.
    Prepare,
    /// First machine translation; response carries a locale payload.
    Primary,
    /// Refines an existing translation; same response shape as primary.
    Revision,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Prepare => "prepare",
            StepKind::Primary => "primary",
            StepKind::Revision => "revision",
        }
    }
}

/// One unit of pipeline work bound to a backend prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub label: String,
    pub kind: StepKind,
    pub prompt_id: u32,
    pub reasoning_effort: ReasoningEffort,
}

impl PipelineStep {
    pub fn request(&self, record_id: u64) -> StepRequest {
        StepRequest {
            inbox_id: record_id,
            gpt_prompt_id: self.prompt_id,
            reasoning_effort: self.reasoning_effort,
        }
    }

    pub async fn run(&self, api: &dyn TranslationApi, record_id: u64) -> Result<Value, ApiError> {
        let request = self.request(record_id);
        match self.kind {
            StepKind::Prepare => api.prepare(&request).await,
            StepKind::Primary => api.primary(&request).await,
            StepKind::Revision => api.revision(&request).await,
        }
    }

    /// Folds a step response into `record`. `None` means the response
    /// carried nothing to apply and the record stays as it was.
    pub fn apply(
        &self,
        record: &TranslationRecord,
        response: &Value,
        language: &LanguageCode,
    ) -> Option<TranslationRecord> {
        match self.kind {
            StepKind::Prepare => {
                let prepared = response.get("body_prepared").filter(|v| is_present(v))?;
                let mut next = record.clone();
                next.body_prepared = Some(prepared.clone());
                Some(next)
            }
            StepKind::Primary | StepKind::Revision => {
                let payload = locale::extract_locale_payload(response)?;
                if let Some(code) = payload.language_tag() {
                    if !code.eq_ignore_ascii_case(language.as_str()) {
                        log::warn!(
                            "{} returned a {} locale while translating to {}",
                            self.label,
                            code,
                            language
                        );
                    }
                }
                Some(locale::merge_locale_into_record(record, &payload))
            }
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

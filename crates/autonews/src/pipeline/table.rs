use std::collections::HashMap;

use crate::api::ReasoningEffort;
use crate::config::{LanguagePipelineConfig, PipelineSettings};
use crate::language::LanguageCode;

use super::error::PipelineError;
use super::step::{PipelineStep, StepKind};

/// Ordered steps per target language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepTable {
    languages: HashMap<LanguageCode, Vec<PipelineStep>>,
}

impl StepTable {
    /// EN on prompts 1-4 and ES on prompts 11-14.
    pub fn builtin() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        settings
            .languages
            .iter()
            .fold(Self::default(), |table, (code, pipeline)| {
                table.with_language(
                    LanguageCode::resolve(code),
                    pipeline,
                    settings.reasoning_effort,
                )
            })
    }

    /// Adds or replaces the steps for `code`.
    pub fn with_language(
        mut self,
        code: LanguageCode,
        pipeline: &LanguagePipelineConfig,
        default_effort: ReasoningEffort,
    ) -> Self {
        let effort = pipeline.reasoning_effort.unwrap_or(default_effort);

        let mut named = vec![
            (StepKind::Prepare, pipeline.prepare, "text preparation".to_string()),
            (StepKind::Primary, pipeline.primary, "primary translation".to_string()),
        ];
        named.extend(
            pipeline
                .revisions
                .iter()
                .map(|r| (StepKind::Revision, r.prompt_id, r.label.clone())),
        );

        let total = named.len();
        let steps = named
            .into_iter()
            .enumerate()
            .map(|(index, (kind, prompt_id, name))| PipelineStep {
                label: format!("Step {}/{} ({}): {}", index + 1, total, code, name),
                kind,
                prompt_id,
                reasoning_effort: effort,
            })
            .collect();

        self.languages.insert(code, steps);
        self
    }

    pub fn steps_for(&self, code: &LanguageCode) -> Result<&[PipelineStep], PipelineError> {
        self.languages
            .get(code)
            .filter(|steps| !steps.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| PipelineError::UnsupportedLanguage(code.clone()))
    }

    pub fn supports(&self, code: &LanguageCode) -> bool {
        self.steps_for(code).is_ok()
    }

    /// Configured languages, sorted.
    pub fn languages(&self) -> Vec<LanguageCode> {
        let mut codes: Vec<_> = self.languages.keys().cloned().collect();
        codes.sort();
        codes
    }
}

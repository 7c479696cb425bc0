//! Drives one record through its language's steps.
//!
//! Runs are fire-and-observe: [`Orchestrator::spawn`] returns immediately
//! with a [`RunHandle`], and progress is published through the
//! [`ProcessingStore`]. A run never surfaces as an error; every ending is a
//! [`RunOutcome`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::api::TranslationApi;
use crate::config::{Config, NotifyConfig};
use crate::language::LanguageCode;
use crate::record::{RecordStatus, TranslationRecord};
use crate::state::{ProcessingStore, RecoveryPolicy};

use super::error::PipelineError;
use super::report::CompletionReport;
use super::step::PipelineStep;
use super::table::StepTable;

/// What to translate: a record already in hand, or an id to fetch first.
#[derive(Debug, Clone)]
pub enum RunTarget {
    Record(Box<TranslationRecord>),
    Id(u64),
}

impl RunTarget {
    pub fn record_id(&self) -> u64 {
        match self {
            RunTarget::Record(record) => record.id,
            RunTarget::Id(id) => *id,
        }
    }
}

impl From<TranslationRecord> for RunTarget {
    fn from(record: TranslationRecord) -> Self {
        RunTarget::Record(Box::new(record))
    }
}

impl From<u64> for RunTarget {
    fn from(id: u64) -> Self {
        RunTarget::Id(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Target language. Falls back to the record's prepared-body tag, then
    /// the configured default.
    pub language: Option<String>,
}

impl From<&str> for RunOptions {
    fn from(language: &str) -> Self {
        Self {
            language: Some(language.to_string()),
        }
    }
}

impl From<LanguageCode> for RunOptions {
    fn from(language: LanguageCode) -> Self {
        Self {
            language: Some(language.into()),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// All steps succeeded; carries the final working copy of the record.
    Completed(Box<TranslationRecord>),
    /// The run started and then failed; the entry is left in `error`.
    Failed(String),
    /// The run never started and processing state was not touched.
    Rejected(PipelineError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn record(&self) -> Option<&TranslationRecord> {
        match self {
            RunOutcome::Completed(record) => Some(record),
            _ => None,
        }
    }
}

/// Handle to a spawned run.
pub struct RunHandle {
    record_id: u64,
    handle: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn record_id(&self) -> u64 {
        self.record_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> RunOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed(format!(
                "Pipeline task for record {} did not finish: {}",
                self.record_id, e
            )),
        }
    }
}

/// Waits for every handle, preserving order.
pub async fn wait_all(handles: Vec<RunHandle>) -> Vec<RunOutcome> {
    futures_util::future::join_all(handles.into_iter().map(RunHandle::wait)).await
}

#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn TranslationApi>,
    store: Arc<ProcessingStore>,
    table: Arc<StepTable>,
    default_language: LanguageCode,
    notify: Arc<NotifyConfig>,
    /// Record ids with a run task alive in this process.
    active: Arc<Mutex<HashSet<u64>>>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn TranslationApi>,
        store: Arc<ProcessingStore>,
        table: StepTable,
        default_language: LanguageCode,
        notify: NotifyConfig,
    ) -> Self {
        Self {
            api,
            store,
            table: Arc::new(table),
            default_language,
            notify: Arc::new(notify),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn from_config(
        api: Arc<dyn TranslationApi>,
        store: Arc<ProcessingStore>,
        config: &Config,
    ) -> Self {
        Self::new(
            api,
            store,
            StepTable::from_settings(&config.pipeline),
            LanguageCode::resolve(&config.pipeline.default_language),
            config.notify.clone(),
        )
    }

    pub fn api(&self) -> &Arc<dyn TranslationApi> {
        &self.api
    }

    pub fn store(&self) -> &Arc<ProcessingStore> {
        &self.store
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    fn active(&self) -> MutexGuard<'_, HashSet<u64>> {
        match self.active.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Orchestrator run set lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// True when a run for `record_id` is in flight here or recorded as
    /// running in the store.
    pub fn is_busy(&self, record_id: u64) -> bool {
        self.active().contains(&record_id) || self.store.is_running(record_id)
    }

    /// Explicit language, then the prepared body's tag, then the default.
    pub fn resolve_language(
        &self,
        record: &TranslationRecord,
        options: &RunOptions,
    ) -> LanguageCode {
        options
            .language
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .or_else(|| record.prepared_language())
            .map(LanguageCode::resolve)
            .unwrap_or_else(|| self.default_language.clone())
    }

    /// Starts a run in the background.
    ///
    /// Refuses with [`PipelineError::AlreadyRunning`] when the record
    /// already has a run in flight. Must be called within a tokio runtime.
    pub fn spawn(&self, target: RunTarget, options: RunOptions) -> RunHandle {
        let record_id = target.record_id();

        let claimed = !self.store.is_running(record_id) && self.active().insert(record_id);
        if !claimed {
            let err = PipelineError::AlreadyRunning(record_id);
            self.store.alert(Some(record_id), &err.to_string());
            return RunHandle {
                record_id,
                handle: tokio::spawn(async move { RunOutcome::Rejected(err) }),
            };
        }

        self.launch(target, options, false)
    }

    /// Runs to completion on the current task. Same guard as [`spawn`](Self::spawn).
    pub async fn run(&self, target: RunTarget, options: RunOptions) -> RunOutcome {
        self.spawn(target, options).wait().await
    }

    /// Starts runs for entries a previous process left behind, as chosen by
    /// `policy`. Entries whose run cannot start are marked as failed so they
    /// do not stay `running` forever.
    pub fn resume_interrupted(&self, policy: &dyn RecoveryPolicy) -> Vec<RunHandle> {
        let plan = policy.plan(&self.store.snapshot());
        if plan.is_empty() {
            return Vec::new();
        }

        info!(count = plan.len(), "Resuming interrupted translation runs");

        plan.into_iter()
            .filter(|action| self.active().insert(action.record_id))
            .map(|action| {
                self.launch(
                    RunTarget::Id(action.record_id),
                    RunOptions::from(action.language),
                    true,
                )
            })
            .collect()
    }

    fn launch(&self, target: RunTarget, options: RunOptions, recovering: bool) -> RunHandle {
        let record_id = target.record_id();
        let this = self.clone();

        let handle = tokio::spawn(async move {
            let outcome = this.execute(target, options).await;

            if recovering {
                if let RunOutcome::Rejected(err) = &outcome {
                    this.store.fail(record_id, &err.to_string());
                }
            }

            this.active().remove(&record_id);
            outcome
        });

        RunHandle { record_id, handle }
    }

    async fn execute(&self, target: RunTarget, options: RunOptions) -> RunOutcome {
        let record = match target {
            RunTarget::Record(record) => *record,
            RunTarget::Id(record_id) => match self.api.fetch_record(record_id).await {
                Ok(record) => record,
                Err(source) => {
                    let err = PipelineError::FetchRecord { record_id, source };
                    error!("{}", err);
                    return RunOutcome::Rejected(err);
                }
            },
        };

        let record_id = record.id;
        let language = self.resolve_language(&record, &options);
        let steps = match self.table.steps_for(&language) {
            Ok(steps) => steps,
            Err(err) => {
                self.store.alert(Some(record_id), &err.to_string());
                return RunOutcome::Rejected(err);
            }
        };

        let span = info_span!("pipeline", record_id, language = %language);
        self.drive(record, language, steps).instrument(span).await
    }

    async fn drive(
        &self,
        record: TranslationRecord,
        language: LanguageCode,
        steps: &[PipelineStep],
    ) -> RunOutcome {
        let record_id = record.id;
        info!(steps = steps.len(), "Starting translation run");

        self.store.begin(
            record_id,
            language.clone(),
            steps.first().map(|s| s.label.clone()),
        );

        if let Err(source) = self.api.update_status(record_id, RecordStatus::Processed).await {
            return self
                .fail(record_id, PipelineError::StatusTransition { record_id, source })
                .await;
        }

        let steps_started = tokio::time::Instant::now();
        let mut working = record;

        for step in steps {
            self.store.set_step(record_id, &step.label);

            let response = match step
                .run(self.api.as_ref(), record_id)
                .instrument(info_span!("step", label = %step.label, prompt_id = step.prompt_id))
                .await
            {
                Ok(response) => response,
                Err(source) => {
                    let err = PipelineError::Step {
                        label: step.label.clone(),
                        source,
                    };
                    return self.fail(record_id, err).await;
                }
            };

            match step.apply(&working, &response, &language) {
                Some(next) => working = next,
                None => debug!(label = %step.label, "Step response left the record unchanged"),
            }
        }

        if let Err(e) = self
            .api
            .update_status(record_id, RecordStatus::ReadyToPublish)
            .await
        {
            warn!("Failed to mark record {} as ready to publish: {}", record_id, e);
        }

        self.report(&working, &language, steps_started.elapsed())
            .await;

        self.store.remove(record_id);
        info!("Translation run completed");
        RunOutcome::Completed(Box::new(working))
    }

    async fn fail(&self, record_id: u64, err: PipelineError) -> RunOutcome {
        let message = err.to_string();
        error!("{}", message);

        if let Err(e) = self.api.update_status(record_id, RecordStatus::Failed).await {
            warn!("Failed to mark record {} as failed: {}", record_id, e);
        }

        self.store.fail(record_id, &message);
        self.store.alert(Some(record_id), &message);
        RunOutcome::Failed(message)
    }

    async fn report(&self, record: &TranslationRecord, language: &LanguageCode, took: Duration) {
        if !self.notify.enabled {
            debug!("Completion reports disabled");
            return;
        }

        let report = CompletionReport::new(record, language, took, &self.notify.app_base_url);
        if let Err(e) = self
            .api
            .send_report(&report.to_slack(&self.notify.channel_id))
            .await
        {
            warn!("Failed to send completion report for record {}: {}", record.id, e);
        }
    }
}

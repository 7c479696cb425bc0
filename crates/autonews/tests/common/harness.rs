//! Wiring of a mock backend, an in-memory state backend and an orchestrator.

use std::sync::Arc;
use std::time::Duration;

use autonews::api::ReasoningEffort;
use autonews::config::{LanguagePipelineConfig, NotifyConfig};
use autonews::state::{MemoryBackend, ProcessingStore};
use autonews::{InboxService, LanguageCode, Orchestrator, StepTable};

use super::mock_api::MockApi;

pub struct TestHarness {
    pub api: Arc<MockApi>,
    pub backend: Arc<MemoryBackend>,
    pub store: Arc<ProcessingStore>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// Built-in EN/ES table, notifications on.
    pub fn new(api: MockApi) -> Self {
        Self::build(api, MemoryBackend::new(), StepTable::builtin(), NotifyConfig::default())
    }

    /// Starts from state persisted by an earlier process.
    pub fn with_snapshot(api: MockApi, json: &str) -> Self {
        Self::build(
            api,
            MemoryBackend::with_snapshot(json),
            StepTable::builtin(),
            NotifyConfig::default(),
        )
    }

    pub fn with_table(api: MockApi, table: StepTable) -> Self {
        Self::build(api, MemoryBackend::new(), table, NotifyConfig::default())
    }

    pub fn with_notify(api: MockApi, notify: NotifyConfig) -> Self {
        Self::build(api, MemoryBackend::new(), StepTable::builtin(), notify)
    }

    fn build(
        api: MockApi,
        backend: MemoryBackend,
        table: StepTable,
        notify: NotifyConfig,
    ) -> Self {
        let api = Arc::new(api);
        let backend = Arc::new(backend);
        let store = ProcessingStore::new(Box::new(backend.clone()), Duration::from_secs(1));
        let orchestrator = Orchestrator::new(
            api.clone(),
            store.clone(),
            table,
            LanguageCode::default(),
            notify,
        );

        Self {
            api,
            backend,
            store,
            orchestrator,
        }
    }

    pub fn inbox(&self) -> InboxService {
        InboxService::new(self.orchestrator.clone())
    }
}

/// EN pipeline with only prepare (prompt 1) and primary (prompt 2).
pub fn two_step_table() -> StepTable {
    let pipeline = LanguagePipelineConfig {
        prepare: 1,
        primary: 2,
        revisions: Vec::new(),
        reasoning_effort: None,
    };
    StepTable::default().with_language(
        LanguageCode::resolve("EN"),
        &pipeline,
        ReasoningEffort::Medium,
    )
}

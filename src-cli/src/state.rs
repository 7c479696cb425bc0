//! Wiring of the library services for one CLI invocation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use autonews::state::StateBackend;
use autonews::{
    load_config_or_default, Config, FileBackend, HttpTranslationApi, InboxService, Orchestrator,
    ProcessingStore, RestartPolicy, RunHandle, TranslationApi,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<ProcessingStore>,
    pub inbox: InboxService,
}

impl AppState {
    /// Loads configuration and rehydrates the processing state from disk.
    /// Must be called within a tokio runtime so interrupted entries keep
    /// their timers running.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_or_default(config_path).context("Failed to load configuration")?;

        let api = HttpTranslationApi::new(&config.api).context("Failed to build API client")?;
        info!("Using translations backend at {}", api.endpoint(""));

        let state_file = config.state.state_file();
        info!("Processing state file: {:?}", state_file);

        Ok(Self::from_parts(
            config,
            Arc::new(api),
            Box::new(FileBackend::new(state_file)),
        ))
    }

    pub fn from_parts(
        config: Config,
        api: Arc<dyn TranslationApi>,
        backend: Box<dyn StateBackend>,
    ) -> Self {
        let store = ProcessingStore::new(
            backend,
            Duration::from_millis(config.state.tick_interval_ms),
        );
        let orchestrator = Orchestrator::from_config(api, Arc::clone(&store), &config);

        Self {
            config,
            store,
            inbox: InboxService::new(orchestrator),
        }
    }

    /// Restarts every run a previous process left `running`.
    pub fn resume_interrupted(&self) -> Vec<RunHandle> {
        let handles = self.orchestrator().resume_interrupted(&RestartPolicy);
        if !handles.is_empty() {
            println!("Resuming {} interrupted run(s)", handles.len());
        }
        handles
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        self.inbox.orchestrator()
    }

    pub fn long_run_threshold(&self) -> Duration {
        Duration::from_secs(self.config.state.long_run_threshold_secs)
    }
}

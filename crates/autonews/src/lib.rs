pub mod api;
pub mod config;
pub mod error;
pub mod inbox;
pub mod language;
pub mod locale;
pub mod pipeline;
pub mod record;
pub mod state;
pub mod telemetry;

pub use api::{HttpTranslationApi, TranslationApi};
pub use config::{load_config, load_config_or_default, Config};
pub use error::{ApiError, AutonewsError, ConfigError, Result, StateError};
pub use inbox::{CreatedRecord, InboxService, RecordDraft};
pub use language::LanguageCode;
pub use pipeline::{
    Orchestrator, PipelineError, RunHandle, RunOptions, RunOutcome, RunTarget, StepTable,
};
pub use record::{LocaleEntry, RecordStatus, TranslationRecord};
pub use state::{
    FileBackend, MemoryBackend, ProcessingEntry, ProcessingEvent, ProcessingStore, RestartPolicy,
};
pub use telemetry::init_logging;

use thiserror::Error;

use crate::error::ApiError;
use crate::language::LanguageCode;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No translation pipeline is configured for language {0}")]
    UnsupportedLanguage(LanguageCode),

    #[error("Record {0} is already being translated")]
    AlreadyRunning(u64),

    #[error("Failed to fetch record {record_id}: {source}")]
    FetchRecord {
        record_id: u64,
        #[source]
        source: ApiError,
    },

    #[error("Failed to mark record {record_id} as in progress: {source}")]
    StatusTransition {
        record_id: u64,
        #[source]
        source: ApiError,
    },

    #[error("{label} failed: {source}")]
    Step {
        label: String,
        #[source]
        source: ApiError,
    },
}

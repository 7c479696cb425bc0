//! Client for the translations backend.
//!
//! The orchestrator and inbox service only talk to the backend through the
//! [`TranslationApi`] trait. [`HttpTranslationApi`] is the production
//! implementation; tests provide in-memory ones.

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::record::{RecordStatus, TranslationRecord};

pub use client::HttpTranslationApi;
pub use types::{
    InboxPage, InboxQuery, NewTranslationRecord, ReasoningEffort, SlackReport, SortOrder,
    StatusUpdate, StepRequest,
};

/// Request/response operations exposed by the translations backend.
///
/// Step endpoints return loosely shaped JSON; interpreting it is left to
/// the pipeline steps.
#[async_trait]
pub trait TranslationApi: Send + Sync {
    async fn list_inbox(&self, query: &InboxQuery) -> Result<InboxPage, ApiError>;

    async fn fetch_record(&self, id: u64) -> Result<TranslationRecord, ApiError>;

    /// Returns the raw creation response: the record itself, `{id}` or `{record}`.
    async fn create_record(&self, record: &NewTranslationRecord) -> Result<Value, ApiError>;

    async fn update_status(&self, id: u64, status: RecordStatus) -> Result<Value, ApiError>;

    async fn prepare(&self, request: &StepRequest) -> Result<Value, ApiError>;

    async fn primary(&self, request: &StepRequest) -> Result<Value, ApiError>;

    async fn revision(&self, request: &StepRequest) -> Result<Value, ApiError>;

    async fn send_report(&self, report: &SlackReport) -> Result<Value, ApiError>;
}

//! Request and response bodies exchanged with the translations backend.

use serde::{Deserialize, Serialize};

use crate::record::{RecordStatus, TranslationRecord};

/// Reasoning effort requested from the model behind a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Body of the prepare, primary and revision step endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRequest {
    pub inbox_id: u64,
    pub gpt_prompt_id: u32,
    pub reasoning_effort: ReasoningEffort,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: RecordStatus,
}

/// Message posted to the reporting channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackReport {
    pub channel_id: String,
    pub text: String,
}

/// Fields accepted when creating an inbox record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTranslationRecord {
    pub source_language: String,
    pub target_language: String,
    pub body_raw: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Pagination and sorting for inbox listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort_by: "id".to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

impl InboxQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
            ("sort_by", self.sort_by.clone()),
            ("sort_order", self.sort_order.as_str().to_string()),
        ]
    }
}

/// One page of the translations inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxPage {
    #[serde(default)]
    pub records: Vec<TranslationRecord>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: u64,
}

fn default_total_pages() -> u32 {
    1
}

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::api::ReasoningEffort;
use crate::language::DEFAULT_TARGET_LANGUAGE;

/// File name of the persisted processing map inside the data directory.
pub const STATE_FILE_NAME: &str = "translations_processing_map.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Model-backed steps can take minutes.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_prefix() -> String {
    "/autonews_api/v1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    600
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
    /// Step table keyed by language code.
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, LanguagePipelineConfig>,
}

fn default_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

fn default_languages() -> BTreeMap<String, LanguagePipelineConfig> {
    let mut languages = BTreeMap::new();
    languages.insert("EN".to_string(), LanguagePipelineConfig::with_base_prompt(1));
    languages.insert("ES".to_string(), LanguagePipelineConfig::with_base_prompt(11));
    languages
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            reasoning_effort: ReasoningEffort::default(),
            languages: default_languages(),
        }
    }
}

/// Prompt ids for one language's steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePipelineConfig {
    pub prepare: u32,
    pub primary: u32,
    #[serde(default)]
    pub revisions: Vec<RevisionConfig>,
    /// Overrides the pipeline-wide reasoning effort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl LanguagePipelineConfig {
    /// Four consecutive prompts: prepare, primary, terminology and lexical revisions.
    pub fn with_base_prompt(base: u32) -> Self {
        Self {
            prepare: base,
            primary: base + 1,
            revisions: vec![
                RevisionConfig {
                    label: "terminology revision".to_string(),
                    prompt_id: base + 2,
                },
                RevisionConfig {
                    label: "lexical revision".to_string(),
                    prompt_id: base + 3,
                },
            ],
            reasoning_effort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionConfig {
    pub label: String,
    pub prompt_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
    /// Base of the deep link sent in completion reports.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

fn default_true() -> bool {
    true
}

fn default_channel_id() -> String {
    "C08QWES1YBG".to_string()
}

fn default_app_base_url() -> String {
    "http://localhost:5173".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_id: default_channel_id(),
            app_base_url: default_app_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Processing map location. Defaults to the platform data directory.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Runs longer than this are flagged as slow. Display only.
    #[serde(default = "default_long_run_threshold")]
    pub long_run_threshold_secs: u64,
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_long_run_threshold() -> u64 {
    4 * 60
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: None,
            tick_interval_ms: default_tick_interval(),
            long_run_threshold_secs: default_long_run_threshold(),
        }
    }
}

impl StateConfig {
    pub fn state_file(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("autonews"))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(STATE_FILE_NAME)
        })
    }
}

//! Translation records as served by the translations inbox.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::locale;

/// Server-side status of a translation record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    New,
    Processed,
    ReadyToPublish,
    Failed,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::New => "new",
            RecordStatus::Processed => "processed",
            RecordStatus::ReadyToPublish => "ready_to_publish",
            RecordStatus::Failed => "failed",
            RecordStatus::Rejected => "rejected",
        }
    }

    /// Statuses from which an operator may restart the pipeline.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecordStatus::ReadyToPublish | RecordStatus::Failed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(RecordStatus::New),
            "processed" => Ok(RecordStatus::Processed),
            "ready_to_publish" => Ok(RecordStatus::ReadyToPublish),
            "failed" => Ok(RecordStatus::Failed),
            "rejected" => Ok(RecordStatus::Rejected),
            other => Err(format!("unknown record status '{}'", other)),
        }
    }
}

/// One language's translation payload.
///
/// Kept as a raw JSON object so that merging preserves fields this crate
/// does not know about.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleEntry(Map<String, Value>);

impl LocaleEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds an entry carrying only a language tag.
    pub fn for_language(code: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("language".to_string(), Value::String(code.to_string()));
        Self(fields)
    }

    /// Wraps a JSON value if it is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|map| Self(map.clone()))
    }

    /// The `language` tag, falling back to the legacy `code` tag.
    pub fn language(&self) -> Option<&str> {
        self.str_field("language").or_else(|| self.str_field("code"))
    }

    /// The `language` tag only; merge candidates are matched on this.
    pub fn language_tag(&self) -> Option<&str> {
        self.str_field("language")
    }

    pub fn header(&self) -> Option<&str> {
        self.str_field("header")
    }

    pub fn sub_header(&self) -> Option<SubHeader<'_>> {
        let value = self.0.get("sub_header")?;
        match value {
            Value::String(text) => Some(SubHeader {
                text: Some(text.as_str()),
                author: None,
                url: None,
            }),
            Value::Object(map) => Some(SubHeader {
                text: map.get("text").and_then(Value::as_str),
                author: map.get("author").and_then(Value::as_str),
                url: map.get("url").and_then(Value::as_str),
            }),
            _ => None,
        }
    }

    /// Ordered prediction text blocks.
    pub fn predictions(&self) -> Vec<&Value> {
        self.0
            .get("predictions")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default()
    }

    pub fn final_prediction(&self) -> Option<&Value> {
        self.0.get("final_prediction").filter(|v| !v.is_null())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copies every field of `other` over this entry.
    pub fn overlay(&self, other: &LocaleEntry) -> LocaleEntry {
        let mut merged = self.0.clone();
        for (key, value) in &other.0 {
            merged.insert(key.clone(), value.clone());
        }
        LocaleEntry(merged)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for LocaleEntry {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Borrowed view of a locale's sub-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubHeader<'a> {
    pub text: Option<&'a str>,
    pub author: Option<&'a str>,
    pub url: Option<&'a str>,
}

/// A unit of translatable content tracked by the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: u64,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub body_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_prepared: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_locales")]
    pub payload_json: Vec<LocaleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields the backend sends that this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TranslationRecord {
    /// A fresh record with only an id and raw body, mostly useful for tests.
    pub fn new(id: u64, body_raw: &str) -> Self {
        Self {
            id,
            status: RecordStatus::New,
            body_raw: body_raw.to_string(),
            headline_raw: None,
            body_prepared: None,
            payload_json: Vec::new(),
            source_language: None,
            target_language: None,
            notes: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Language tag embedded in a per-language prepared body, if any.
    pub fn prepared_language(&self) -> Option<&str> {
        self.body_prepared
            .as_ref()
            .and_then(|prepared| prepared.get("language"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn locale(&self, code: &str) -> Option<&LocaleEntry> {
        locale::find_locale(&self.payload_json, code)
    }

    /// Headline when present, otherwise the body collapsed to a single
    /// line and cut to 80 characters.
    pub fn title_or_snippet(&self) -> String {
        if let Some(headline) = self.headline_raw.as_deref().filter(|h| !h.is_empty()) {
            return headline.to_string();
        }

        let collapsed = self.body_raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return "(untitled)".to_string();
        }

        if collapsed.chars().count() <= 80 {
            return collapsed;
        }

        let head: String = collapsed.chars().take(77).collect();
        format!("{}...", head)
    }
}

fn deserialize_locales<'de, D>(deserializer: D) -> Result<Vec<LocaleEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(locale::normalize_locales(&value))
}

fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server timestamps are display-only, so anything unparseable becomes `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

/// RFC 3339, or a naive ISO 8601 date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let parsed = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc());
    if parsed.is_none() {
        log::debug!("Ignoring unparseable timestamp '{}'", raw);
    }
    parsed
}

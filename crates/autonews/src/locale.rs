//! Merging and normalization of per-language locale payloads.
//!
//! All functions here are pure: they take borrowed input and return new
//! collections, so merging the same candidate twice is a no-op the second
//! time.

use serde_json::Value;

use crate::language::display_rank;
use crate::record::{LocaleEntry, TranslationRecord};

/// Inserts or updates `candidate` in `locales`, keyed by language code.
///
/// An existing entry whose `language` (or legacy `code`) equals the
/// candidate's `language` is shallow-merged with the candidate's fields
/// winning. Otherwise the candidate is appended. A candidate without a
/// language tag leaves the collection unchanged.
pub fn upsert_locale(locales: &[LocaleEntry], candidate: &LocaleEntry) -> Vec<LocaleEntry> {
    let mut result = locales.to_vec();

    let Some(code) = candidate.language_tag() else {
        return result;
    };

    match result.iter().position(|entry| entry.language() == Some(code)) {
        Some(index) => {
            result[index] = result[index].overlay(candidate);
        }
        None => result.push(candidate.clone()),
    }

    result
}

/// Returns a copy of `record` with `candidate` merged into its locales.
///
/// Records that still carry the legacy `payload` array get it kept in step
/// with `payload_json`.
pub fn merge_locale_into_record(
    record: &TranslationRecord,
    candidate: &LocaleEntry,
) -> TranslationRecord {
    let locales = upsert_locale(&record.payload_json, candidate);

    let mut merged = record.clone();
    if matches!(merged.extra.get("payload"), Some(Value::Array(_))) {
        let mirrored = locales
            .iter()
            .map(|entry| Value::Object(entry.fields().clone()))
            .collect();
        merged
            .extra
            .insert("payload".to_string(), Value::Array(mirrored));
    }
    merged.payload_json = locales;
    merged
}

/// Finds the locale payload inside a step response.
///
/// Probed in order: the response itself, `locale`, `payload`, then the
/// first element of a `payload` array. Only objects carrying a non-empty
/// `language` tag qualify.
pub fn extract_locale_payload(response: &Value) -> Option<LocaleEntry> {
    if has_language(response) {
        return LocaleEntry::from_value(response);
    }

    if let Some(locale) = response.get("locale").filter(|v| has_language(v)) {
        return LocaleEntry::from_value(locale);
    }

    match response.get("payload") {
        Some(payload) if has_language(payload) => LocaleEntry::from_value(payload),
        Some(Value::Array(items)) => items
            .iter()
            .find(|item| has_language(item))
            .and_then(LocaleEntry::from_value),
        _ => None,
    }
}

fn has_language(value: &Value) -> bool {
    value
        .get("language")
        .and_then(Value::as_str)
        .is_some_and(|code| !code.is_empty())
}

/// Decodes whatever the backend stored as a record's locales.
///
/// Accepts an array, a single locale object, an object keyed by language,
/// or a JSON string holding any of those. Anything else decodes to an
/// empty list.
pub fn normalize_locales(value: &Value) -> Vec<LocaleEntry> {
    match value {
        Value::Null => Vec::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(_)) => Vec::new(),
            Ok(parsed) => normalize_locales(&parsed),
            Err(e) => {
                log::warn!("Failed to parse locale list: {}", e);
                Vec::new()
            }
        },
        Value::Array(items) => items.iter().filter_map(LocaleEntry::from_value).collect(),
        Value::Object(map) => {
            if map.contains_key("language") || map.contains_key("code") {
                LocaleEntry::from_value(value).into_iter().collect()
            } else {
                map.values().filter_map(LocaleEntry::from_value).collect()
            }
        }
        _ => Vec::new(),
    }
}

/// Orders locales for display: known languages first, unknown last.
pub fn sort_locales_by_display_order(locales: &[LocaleEntry]) -> Vec<LocaleEntry> {
    let mut sorted = locales.to_vec();
    sorted.sort_by_key(|entry| display_rank(entry.language().unwrap_or("")));
    sorted
}

pub fn find_locale<'a>(locales: &'a [LocaleEntry], code: &str) -> Option<&'a LocaleEntry> {
    locales.iter().find(|entry| entry.language() == Some(code))
}

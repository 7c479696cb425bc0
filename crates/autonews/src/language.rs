//! Language codes and display metadata for translation targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source language tag sent to the backend when creating records.
pub const SOURCE_LANGUAGE: &str = "world";

/// Target language used when neither the caller nor the record names one.
pub const DEFAULT_TARGET_LANGUAGE: &str = "EN";

/// Order in which locales are presented to operators.
pub const LANGUAGE_DISPLAY_ORDER: &[&str] = &["EN", "ES"];

/// Uppercased language code, e.g. `EN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Normalizes a raw code. Blank input falls back to the default target language.
    pub fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self(DEFAULT_TARGET_LANGUAGE.to_string())
        } else {
            Self(trimmed.to_uppercase())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for two ASCII letters, the shape pipeline tables are keyed by.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 2 && self.0.chars().all(|c| c.is_ascii_uppercase())
    }

    pub fn definition(&self) -> LanguageDefinition {
        LanguageDefinition::lookup(&self.0)
    }

    pub fn label(&self) -> &str {
        language_label(&self.0)
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self(DEFAULT_TARGET_LANGUAGE.to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(raw: &str) -> Self {
        Self::resolve(raw)
    }
}

impl From<String> for LanguageCode {
    fn from(raw: String) -> Self {
        Self::resolve(&raw)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// Display metadata for a supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageDefinition {
    pub code: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub flag: &'static str,
}

const KNOWN_LANGUAGES: &[LanguageDefinition] = &[
    LanguageDefinition {
        code: "EN",
        label: "English",
        description: "English (UK)",
        flag: "\u{1F1EC}\u{1F1E7}",
    },
    LanguageDefinition {
        code: "ES",
        label: "Spanish",
        description: "Español",
        flag: "\u{1F1EA}\u{1F1F8}",
    },
];

impl LanguageDefinition {
    fn lookup(code: &str) -> Self {
        KNOWN_LANGUAGES
            .iter()
            .find(|def| def.code == code)
            .copied()
            .unwrap_or(Self {
                code: "",
                label: "",
                description: "",
                flag: "",
            })
    }

    pub fn is_known(&self) -> bool {
        !self.code.is_empty()
    }
}

/// Human-readable label for a code; unknown codes label themselves.
pub fn language_label(code: &str) -> &str {
    KNOWN_LANGUAGES
        .iter()
        .find(|def| def.code == code)
        .map(|def| def.label)
        .unwrap_or(code)
}

/// Position of a code in the display order; unknown codes sort last.
pub fn display_rank(code: &str) -> usize {
    LANGUAGE_DISPLAY_ORDER
        .iter()
        .position(|known| *known == code)
        .unwrap_or(LANGUAGE_DISPLAY_ORDER.len())
}

use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::language::LanguageCode;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "AUTONEWS_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        load_config_from_json_str(&content)
    } else {
        load_config_from_str(&content)
    }
}

/// Parses YAML (a superset of JSON) config text.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let value: serde_json::Value = if content.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_yaml::from_str(content)?
    };
    load_config_from_value(value)
}

pub fn load_config_from_json_str(content: &str) -> Result<Config, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    load_config_from_value(value)
}

fn load_config_from_value(value: serde_json::Value) -> Result<Config, ConfigError> {
    validate_schema(&value)?;

    let config: Config = serde_json::from_value(value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Resolves the config file to use: explicit path, then `AUTONEWS_CONFIG`,
/// then `{config_dir}/autonews/config.yaml`. A missing default file yields
/// the built-in defaults; a missing explicit file is an error.
pub fn load_config_or_default(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return load_config(PathBuf::from(path));
    }

    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => {
            log::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autonews").join("config.yaml"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    Url::parse(&config.api.base_url).map_err(|e| ConfigError::Validation {
        message: format!("Invalid api.base_url '{}': {}", config.api.base_url, e),
    })?;

    if config.notify.enabled {
        Url::parse(&config.notify.app_base_url).map_err(|e| ConfigError::Validation {
            message: format!(
                "Invalid notify.app_base_url '{}': {}",
                config.notify.app_base_url, e
            ),
        })?;

        if config.notify.channel_id.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "notify.channel_id must be set when notifications are enabled"
                    .to_string(),
            });
        }
    }

    let default_language = LanguageCode::resolve(&config.pipeline.default_language);
    if !default_language.is_well_formed() {
        return Err(ConfigError::Validation {
            message: format!(
                "pipeline.default_language '{}' is not a two-letter code",
                config.pipeline.default_language
            ),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for (code, pipeline) in &config.pipeline.languages {
        let language = LanguageCode::resolve(code);
        if !language.is_well_formed() {
            return Err(ConfigError::InvalidPipeline {
                language: code.clone(),
                reason: "Language keys must be two-letter codes".to_string(),
            });
        }

        if !seen.insert(language) {
            return Err(ConfigError::InvalidPipeline {
                language: code.clone(),
                reason: "Duplicate language (keys are case-insensitive)".to_string(),
            });
        }

        let mut prompt_ids = std::collections::HashSet::new();
        let all_prompts = [pipeline.prepare, pipeline.primary]
            .into_iter()
            .chain(pipeline.revisions.iter().map(|r| r.prompt_id));
        for prompt_id in all_prompts {
            if !prompt_ids.insert(prompt_id) {
                return Err(ConfigError::InvalidPipeline {
                    language: code.clone(),
                    reason: format!("Prompt id {} is bound to more than one step", prompt_id),
                });
            }
        }
    }

    Ok(())
}

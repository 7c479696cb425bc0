pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_config, load_config_from_json_str, load_config_from_str,
    load_config_or_default, CONFIG_PATH_ENV,
};
pub use schema::{
    ApiConfig, Config, LanguagePipelineConfig, NotifyConfig, PipelineSettings, RevisionConfig,
    StateConfig, STATE_FILE_NAME,
};

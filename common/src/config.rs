use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::PrivacyLevel;

/// Recognized configuration options (spec.md §6), with the defaults given
/// there. Loaded the same way the teacher loads `AppConfig`: an optional
/// `config` file layered under environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub privacy_level: PrivacyLevel,
    pub max_context_size: u32,
    pub default_relevance_threshold: f32,
    pub enable_caching: bool,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub conflict_detection_threshold: f32,
    pub source_timeout_secs: u64,
    pub max_concurrent_sources: usize,
    pub vector_dimension: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            privacy_level: PrivacyLevel::Public,
            max_context_size: 10_000,
            default_relevance_threshold: 0.5,
            enable_caching: true,
            cache_ttl_secs: 3_600,
            cache_capacity: 1_000,
            conflict_detection_threshold: 0.7,
            source_timeout_secs: 30,
            max_concurrent_sources: 10,
            vector_dimension: 384,
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Load configuration from an optional `config.toml`/`config.yaml` next to
/// the process plus `RAGCTX_*`-prefixed environment variables, falling back
/// to [`AppConfig::default`] when neither is set.
pub fn get_config() -> Result<AppConfig, AppError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::with_prefix("RAGCTX").separator("__"))
        .build()?;

    match config.try_deserialize() {
        Ok(cfg) => Ok(cfg),
        Err(config::ConfigError::NotFound(_)) => Ok(AppConfig::default()),
        Err(err) => Err(AppError::Config(err)),
    }
}

//! Runtime configuration from environment variables.

use std::path::PathBuf;

use thiserror::Error;

use crate::logging::{LogConfig, LogFormat, LoggingError};
use crate::models::Locale;

/// SQLite file path; unset means an in-memory store.
pub const ENV_DB_PATH: &str = "PATIENT_REGISTRY_DB";
/// `en` or `es`.
pub const ENV_LOCALE: &str = "PATIENT_REGISTRY_LOCALE";
/// Seed the two demo patients into an empty store.
pub const ENV_SEED_DEMO: &str = "PATIENT_REGISTRY_SEED_DEMO";
/// `EnvFilter` directive.
pub const ENV_LOG_FILTER: &str = "PATIENT_REGISTRY_LOG";
/// `pretty`, `compact` or `json`.
pub const ENV_LOG_FORMAT: &str = "PATIENT_REGISTRY_LOG_FORMAT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub database_path: Option<PathBuf>,
    pub locale: Locale,
    pub seed_demo_data: bool,
    pub log: LogConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            locale: Locale::default(),
            seed_demo_data: true,
            log: LogConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.database_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(value) = get(ENV_LOCALE) {
            config.locale = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LOCALE,
                value,
            })?;
        }

        if let Some(value) = get(ENV_SEED_DEMO) {
            config.seed_demo_data = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_SEED_DEMO,
                value,
            })?;
        }

        if let Some(filter) = get(ENV_LOG_FILTER) {
            config.log.filter = filter.trim().to_string();
        }

        if let Some(value) = get(ENV_LOG_FORMAT) {
            config.log.format = value.parse::<LogFormat>()?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

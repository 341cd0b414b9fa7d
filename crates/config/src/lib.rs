//! Configuration management for Neo
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, then `config/{env}.yaml`)
//! - Environment variables (`NEO__` prefix, `__` as the section separator)
//!
//! Vocabulary tables (triggers, stopwords, domain terms) are plain
//! configuration with built-in defaults, so deployments can retune them
//! without a rebuild.

pub mod constants;
pub mod settings;
pub mod vocabulary;

pub use settings::{
    load_settings, ContextWindowConfig, KnowledgeConfig, LlmSettings, ObservabilityConfig,
    RagConfig, RuntimeEnvironment, Settings,
};
pub use vocabulary::VocabularyConfig;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for neo_core::Error {
    fn from(err: ConfigError) -> Self {
        neo_core::Error::Config(err.to_string())
    }
}

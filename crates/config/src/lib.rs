//! Configuration management for the tourism RAG service
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (TOUR_AGENT_ prefix)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, CacheConfig, ConversationConfig, EmbeddingConfig, EnrichmentConfig,
    GeneratorConfig, SearchConfig, ServerConfig, Settings, TranslatorConfig, VectorStoreConfig,
    WorkerConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

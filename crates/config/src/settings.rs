//! Main settings module
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `TOUR_AGENT_*` environment variables (double underscore as the
//! section separator, e.g. `TOUR_AGENT_GENERATOR__API_KEY`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{cache, conversation, deadlines, endpoints, search};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub translator: TranslatorConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whole-request deadline enforced by the HTTP layer
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: false,
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Vector store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_qdrant_endpoint() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| endpoints::QDRANT_DEFAULT.to_string())
}

fn default_collection() -> String {
    "tourism_attractions".to_string()
}

fn default_vector_dim() -> usize {
    384
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_qdrant_endpoint(),
            collection: default_collection(),
            vector_dim: default_vector_dim(),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
        }
    }
}

/// Embedding model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name; "hashing" selects the deterministic local embedder
    #[serde(default = "default_embedding_model")]
    pub model_name: String,
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_vector_dim")]
    pub dimension: usize,
}

fn default_embedding_model() -> String {
    "hashing".to_string()
}

fn default_embedding_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            endpoint: default_embedding_endpoint(),
            dimension: default_vector_dim(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
    #[serde(default = "default_result_cache_max")]
    pub result_cache_max: usize,
    #[serde(default = "default_result_cache_ttl")]
    pub result_cache_ttl_secs: u64,
    /// When true, non-EN/RU target languages imply a language=EN filter
    #[serde(default)]
    pub imply_language_filter: bool,
}

fn default_max_candidates() -> usize {
    search::MAX_CANDIDATES
}

fn default_top_k() -> usize {
    search::DEFAULT_TOP_K
}

fn default_bm25_k1() -> f32 {
    search::BM25_K1
}

fn default_bm25_b() -> f32 {
    search::BM25_B
}

fn default_rrf_k() -> f32 {
    search::RRF_K
}

fn default_result_cache_max() -> usize {
    search::RESULT_CACHE_MAX
}

fn default_result_cache_ttl() -> u64 {
    search::RESULT_CACHE_TTL_SECS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            top_k: default_top_k(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
            rrf_k: default_rrf_k(),
            result_cache_max: default_result_cache_max(),
            result_cache_ttl_secs: default_result_cache_ttl(),
            imply_language_filter: false,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Remote cache URL; None operates memory-only
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    cache::DEFAULT_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote_url: std::env::var("CACHE_URL").ok(),
            default_ttl_secs: default_cache_ttl(),
        }
    }
}

/// Enrichment sources; every key is optional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub unsplash_access_key: Option<String>,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default = "default_enrichment_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_enrichment_timeout() -> u64 {
    deadlines::ENRICHMENT_SECS
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unsplash_access_key: std::env::var("UNSPLASH_ACCESS_KEY").ok(),
            serpapi_api_key: std::env::var("SERPAPI_API_KEY").ok(),
            fetch_timeout_secs: default_enrichment_timeout(),
        }
    }
}

/// Answer generator (remote LLM)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_anthropic_key")]
    pub api_key: String,
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_generator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_anthropic_key() -> String {
    std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
}

fn default_generator_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_generator_endpoint() -> String {
    endpoints::ANTHROPIC_DEFAULT.to_string()
}

fn default_max_tokens() -> usize {
    800
}

fn default_temperature() -> f32 {
    0.7
}

fn default_generation_timeout() -> u64 {
    deadlines::GENERATION_SECS
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: default_anthropic_key(),
            model: default_generator_model(),
            endpoint: default_generator_endpoint(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// Translator / detector fallback (remote LLM)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_groq_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_translator_model")]
    pub model: String,
    #[serde(default = "default_translator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_translate_timeout")]
    pub timeout_secs: u64,
}

fn default_groq_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok()
}

fn default_translator_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_translator_endpoint() -> String {
    endpoints::GROQ_DEFAULT.to_string()
}

fn default_translate_timeout() -> u64 {
    deadlines::TRANSLATE_SECS
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: default_groq_key(),
            model: default_translator_model(),
            endpoint: default_translator_endpoint(),
            timeout_secs: default_translate_timeout(),
        }
    }
}

/// Conversation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_conversation_ttl")]
    pub ttl_secs: u64,
}

fn default_max_history() -> usize {
    conversation::MAX_HISTORY
}

fn default_conversation_ttl() -> u64 {
    conversation::TTL_SECS
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            ttl_secs: default_conversation_ttl(),
        }
    }
}

/// Background worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings; configuration errors are fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_store.endpoint.is_empty() {
            return Err(ConfigError::MissingField("vector_store.endpoint".into()));
        }
        if self.vector_store.collection.is_empty() {
            return Err(ConfigError::MissingField("vector_store.collection".into()));
        }
        if self.generator.api_key.is_empty() {
            return Err(ConfigError::MissingField("generator.api_key".into()));
        }
        if self.search.top_k == 0 || self.search.max_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search".into(),
                message: "top_k and max_candidates must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.generator.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "generator.temperature".into(),
                message: "must be within [0.0, 1.0]".into(),
            });
        }
        if self.worker.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.workers".into(),
                message: "at least one worker is required".into(),
            });
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_secs".into(),
                message: "request timeout must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Load settings from an optional file plus environment overrides
pub fn load_settings(config_path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path));
        } else {
            return Err(ConfigError::FileNotFound(path.to_string()));
        }
    } else if Path::new("config/default.toml").exists() {
        builder = builder.add_source(File::with_name("config/default"));
    }

    builder = builder.add_source(
        Environment::with_prefix("TOUR_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let settings = Settings::default();
        assert_eq!(settings.search.max_candidates, 200);
        assert_eq!(settings.search.top_k, 5);
        assert_eq!(settings.conversation.max_history, 20);
        assert_eq!(settings.worker.workers, 2);
        assert_eq!(settings.server.request_timeout_secs, 60);
        assert!(!settings.server.cors_enabled);
        assert!((settings.search.bm25_k1 - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_requires_generator_key() {
        let mut settings = Settings::default();
        settings.generator.api_key = String::new();
        assert!(settings.validate().is_err());

        settings.generator.api_key = "sk-test".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut settings = Settings::default();
        settings.generator.api_key = "sk-test".to_string();
        settings.search.top_k = 0;
        assert!(settings.validate().is_err());
    }
}

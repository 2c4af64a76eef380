//! Answer generation
//!
//! Features:
//! - Claude Messages API backend (non-streaming)
//! - Multilingual prompt shape: language preamble + English body keyed
//!   by intent
//! - Hard 30-second generation deadline with canned localized fallbacks
//! - Disclaimer pass over the generated answer

pub mod claude;
pub mod generator;
pub mod prompt;

pub use claude::{ClaudeBackend, ClaudeConfig, Completion, CompletionBackend};
pub use generator::{GeneratedAnswer, ResponseGenerator};
pub use prompt::{error_message, timeout_message};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for tour_agent_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => tour_agent_core::Error::Timeout("generation".to_string()),
            LlmError::Configuration(msg) => tour_agent_core::Error::Configuration(msg),
            other => tour_agent_core::Error::Generation(other.to_string()),
        }
    }
}

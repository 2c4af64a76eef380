//! Multilingual dispatch: detection, translation gate, disclaimers
//!
//! Features:
//! - Script-class detection followed by distinctive whole-word matching
//!   with a zero-overlap guarantee across the 18 languages
//! - Remote-LLM fallback for detection, validated against the allow-list
//! - Query translation to English for search recall, two-tier cached
//! - Language-enforcement prompt preamble for the generator
//! - Disclaimer tables for all 18 languages

pub mod detect;
pub mod disclaimer;
pub mod manager;
pub mod translator;

pub use detect::{detect_by_script, detect_by_words, verify_no_overlaps};
pub use disclaimer::DisclaimerManager;
pub use manager::{MultilingualManager, TranslationStats};
pub use translator::{GroqTranslator, TranslatorBackend};

use thiserror::Error;

/// Multilingual errors
#[derive(Error, Debug)]
pub enum MultilingualError {
    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout")]
    Timeout,
}

impl From<reqwest::Error> for MultilingualError {
    fn from(err: reqwest::Error) -> Self {
        MultilingualError::Network(err.to_string())
    }
}

impl From<MultilingualError> for tour_agent_core::Error {
    fn from(err: MultilingualError) -> Self {
        tour_agent_core::Error::Multilingual(err.to_string())
    }
}

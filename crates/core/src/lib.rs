//! Core types for the tourism RAG service
//!
//! This crate provides foundational types used across all other crates:
//! - Error types
//! - Document and payload types (vector-store payloads as JSON maps)
//! - Query analysis and search result types
//! - Language definitions (18 supported languages)
//! - Conversation message types

pub mod document;
pub mod language;
pub mod message;
pub mod types;

pub use document::{Document, Payload};
pub use language::Language;
pub use message::{Message, MessageRole};
pub use types::{
    FilterClause, FilterStrategy, FusionInfo, QueryAnalysis, QueryComplexity, QueryIntent,
    SearchResult,
};

use thiserror::Error;

/// Top-level error for the tourism RAG service
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Multilingual error: {0}")]
    Multilingual(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable kind for response metadata
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Cache(_) => "cache",
            Error::VectorStore(_) => "vector_store",
            Error::Search(_) => "search",
            Error::Multilingual(_) => "multilingual",
            Error::Enrichment(_) => "enrichment",
            Error::Generation(_) => "generation",
            Error::Conversation(_) => "conversation",
            Error::Timeout(_) => "timeout",
            Error::InvalidInput(_) => "invalid_input",
            Error::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Hybrid retrieval pipeline
//!
//! Features:
//! - Metadata-filtered candidate pre-selection over the vector index
//! - Parallel lexical (BM25) and dense (cosine) scoring within the
//!   candidate set
//! - Rank-based fusion with contextual boosts
//! - Per-stage result caches keyed to survive across candidate sets
//! - Lazy, thread-safe embedding model ownership

pub mod analyzer;
pub mod bm25;
pub mod dense;
pub mod embeddings;
pub mod fusion;
pub mod hybrid;
pub mod models;
pub mod prefilter;
pub mod tokenize;
pub mod vector_store;

pub use analyzer::QueryAnalyzer;
pub use bm25::Bm25Engine;
pub use dense::DenseEngine;
pub use embeddings::{Embedder, EmbedderConfig, HashingEmbedder, RemoteEmbedder};
pub use fusion::FusionEngine;
pub use hybrid::{HybridSearchEngine, SearchOutcome, SearchPerformance};
pub use models::{ModelHolder, ModelHolderStats};
pub use prefilter::{CandidateSet, PreFilterEngine};
pub use vector_store::{ScoredPoint, VectorStore};

use thiserror::Error;

/// Search errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Model error: {0}")]
    Model(String),
}

impl From<SearchError> for tour_agent_core::Error {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::VectorStore(msg) | SearchError::Connection(msg) => {
                tour_agent_core::Error::VectorStore(msg)
            }
            other => tour_agent_core::Error::Search(other.to_string()),
        }
    }
}

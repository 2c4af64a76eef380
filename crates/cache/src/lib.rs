//! Two-level namespaced cache
//!
//! Features:
//! - Temporary tier (TTL) and permanent tier (no TTL) in one store
//! - Remote-first reads with guarded in-memory fallback
//! - Per-namespace statistics with atomic counters
//! - TTL + evict-oldest result caches for the retrieval engines

pub mod remote;
pub mod result_cache;
pub mod store;

pub use remote::{InMemoryRemote, RemoteCache};
pub use result_cache::{ResultCache, ResultCacheStats};
pub use store::{CacheStore, NamespaceStats};

use thiserror::Error;

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Remote cache error: {0}")]
    Remote(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<CacheError> for tour_agent_core::Error {
    fn from(err: CacheError) -> Self {
        tour_agent_core::Error::Cache(err.to_string())
    }
}

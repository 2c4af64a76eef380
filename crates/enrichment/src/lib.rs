//! Web enrichment for sparse corpus entries
//!
//! Features:
//! - Gate on description/image sparsity of the top results
//! - Permanent-cache-first lookup (expensive third-party fetches are
//!   never refetched)
//! - Parallel source fetches with per-call deadlines and graceful
//!   degradation
//! - Background vector-store write-backs via the worker pool
//! - Deterministic location extraction from payload metadata

pub mod location;
pub mod persister;
pub mod sources;
pub mod web;

pub use location::{LocationExtractor, LocationInfo};
pub use persister::EnrichmentPersister;
pub use sources::{SerpApiClient, UnsplashClient, UnsplashImage, WikipediaClient, WikipediaSummary};
pub use web::{EnrichmentResult, WebEnrichmentEngine};

use thiserror::Error;

/// Enrichment errors
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Persist error: {0}")]
    Persist(String),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        EnrichmentError::Network(err.to_string())
    }
}

impl From<EnrichmentError> for tour_agent_core::Error {
    fn from(err: EnrichmentError) -> Self {
        tour_agent_core::Error::Enrichment(err.to_string())
    }
}

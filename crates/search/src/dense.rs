//! Dense scoring within the candidate set
//!
//! The cache key is built from the dense query, top_k and the metadata
//! filter only, never the candidate set: a cached ranking for one
//! candidate set serves another after local id intersection.

use qdrant_client::qdrant::{
    condition::ConditionOneOf, Condition, Filter, HasIdCondition,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tour_agent_cache::{ResultCache, ResultCacheStats};
use tour_agent_core::types::sources;
use tour_agent_core::SearchResult;

use crate::models::ModelHolder;
use crate::vector_store::{point_id_from_str, VectorStore};
use crate::SearchError;

/// Raw similarity at or below this is noise
const MIN_SCORE: f32 = 0.05;

/// Dense vector search engine with candidate-independent caching
pub struct DenseEngine {
    store: Arc<VectorStore>,
    models: Arc<ModelHolder>,
    model_name: String,
    cache: ResultCache<Vec<SearchResult>>,
}

impl DenseEngine {
    pub fn new(
        store: Arc<VectorStore>,
        models: Arc<ModelHolder>,
        model_name: impl Into<String>,
        cache_max: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            models,
            model_name: model_name.into(),
            cache: ResultCache::new(cache_max, cache_ttl),
        }
    }

    /// Dense search, optionally restricted to a candidate id set
    pub async fn search(
        &self,
        dense_query: &str,
        candidate_ids: Option<&[String]>,
        top_k: usize,
        metadata_filter: Option<Filter>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if dense_query.trim().is_empty() {
            tracing::warn!("empty dense query");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let cache_key = Self::cache_key(dense_query, top_k, metadata_filter.as_ref());

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::info!("dense cache hit");
            return Ok(match candidate_ids {
                Some(ids) => {
                    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                    cached
                        .into_iter()
                        .filter(|r| wanted.contains(r.doc_id.as_str()))
                        .take(top_k)
                        .collect()
                }
                None => cached.into_iter().take(top_k).collect(),
            });
        }

        tracing::info!("dense cache miss, executing search");

        let model = self.models.get(&self.model_name).await?;
        let vector = model.encode(dense_query).await?;

        let filter = match candidate_ids {
            Some(ids) if !ids.is_empty() => {
                tracing::debug!(ids = ids.len(), "restricting dense search to candidates");
                Some(Filter {
                    must: vec![Condition {
                        condition_one_of: Some(ConditionOneOf::HasId(HasIdCondition {
                            has_id: ids.iter().map(|id| point_id_from_str(id)).collect(),
                        })),
                    }],
                    ..Default::default()
                })
            }
            _ => metadata_filter,
        };

        // over-fetch to leave room for local filtering on later hits
        let points = self
            .store
            .search(vector, filter, top_k * 2, true)
            .await?;

        let source = if candidate_ids.is_some() {
            sources::DENSE_FOCUSED
        } else {
            sources::DENSE_STANDARD
        };

        let results: Vec<SearchResult> = points
            .into_iter()
            .filter(|p| p.score > MIN_SCORE)
            .map(|p| SearchResult::new(p.id, p.score, source, p.payload))
            .collect();

        if !results.is_empty() {
            self.cache.insert(cache_key, results.clone());
        }

        tracing::info!(
            results = results.len(),
            focused = candidate_ids.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dense search completed"
        );

        Ok(results.into_iter().take(top_k).collect())
    }

    fn cache_key(dense_query: &str, top_k: usize, metadata_filter: Option<&Filter>) -> String {
        let normalized = dense_query.trim().to_lowercase();
        let filter_part = metadata_filter
            .map(|f| format!("{f:?}"))
            .unwrap_or_else(|| "no_filter".to_string());
        let raw = format!("{normalized}|{top_k}|{filter_part}");
        format!("dense:{:x}", md5::compute(raw))
    }

    pub fn cache_stats(&self) -> ResultCacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn reset_cache_stats(&self) {
        self.cache.reset_stats();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_candidate_set() {
        // identical query and k must map to the same key regardless of
        // who later intersects the result
        let a = DenseEngine::cache_key("  Beautiful Places  ", 10, None);
        let b = DenseEngine::cache_key("beautiful places", 10, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_varies_with_top_k_and_filter() {
        let base = DenseEngine::cache_key("query", 10, None);
        assert_ne!(base, DenseEngine::cache_key("query", 20, None));

        let filter = Filter::default();
        assert_ne!(base, DenseEngine::cache_key("query", 10, Some(&filter)));
    }
}

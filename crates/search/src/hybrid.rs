//! Hybrid search orchestrator
//!
//! Sequences analyzer → prefilter → (BM25 ‖ dense) → fusion. When the
//! prefilter yields no candidates, falls through to a dense-only search
//! on the dense query. Lexical and dense scoring share one deadline and
//! run in parallel; BM25 runs on the blocking pool.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tour_agent_config::{SearchConfig, Settings};
use tour_agent_core::types::sources;
use tour_agent_core::{QueryAnalysis, SearchResult};

use crate::analyzer::QueryAnalyzer;
use crate::bm25::Bm25Engine;
use crate::dense::DenseEngine;
use crate::fusion::FusionEngine;
use crate::models::ModelHolder;
use crate::prefilter::PreFilterEngine;
use crate::vector_store::VectorStore;
use crate::SearchError;

/// Per-stage wall-clock accounting for one search
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SearchPerformance {
    pub total_ms: u64,
    pub prefilter_ms: u64,
    pub bm25_ms: u64,
    pub dense_ms: u64,
    pub fusion_ms: u64,
    pub prefilter_candidates: usize,
    pub strategy_used: String,
    pub fallback_used: bool,
}

/// Result of one hybrid search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub analysis: QueryAnalysis,
    pub performance: SearchPerformance,
    pub cache_info: Value,
}

/// Hybrid search engine with centralized caching
pub struct HybridSearchEngine {
    analyzer: QueryAnalyzer,
    prefilter: Arc<PreFilterEngine>,
    bm25: Arc<Bm25Engine>,
    dense: Arc<DenseEngine>,
    fusion: Arc<FusionEngine>,
    store: Arc<VectorStore>,
    config: SearchConfig,
}

impl HybridSearchEngine {
    pub fn new(settings: &Settings, store: Arc<VectorStore>, models: Arc<ModelHolder>) -> Self {
        let config = settings.search.clone();
        let cache_ttl = Duration::from_secs(config.result_cache_ttl_secs);

        Self {
            analyzer: QueryAnalyzer::new(config.imply_language_filter),
            prefilter: Arc::new(PreFilterEngine::new(
                Arc::clone(&store),
                Arc::clone(&models),
                settings.embedding.model_name.clone(),
                config.result_cache_max,
                cache_ttl,
            )),
            bm25: Arc::new(Bm25Engine::new(
                config.bm25_k1,
                config.bm25_b,
                config.result_cache_max,
                cache_ttl,
            )),
            dense: Arc::new(DenseEngine::new(
                Arc::clone(&store),
                models,
                settings.embedding.model_name.clone(),
                config.result_cache_max,
                cache_ttl,
            )),
            fusion: Arc::new(FusionEngine::new(config.rrf_k)),
            store,
            config,
        }
    }

    /// Main entry point for retrieval
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let analysis = self.analyzer.analyze(query);

        let mut outcome = self.focused_search(&analysis, top_k).await?;
        outcome.performance.total_ms = started.elapsed().as_millis() as u64;

        metrics::histogram!("search_duration_ms").record(outcome.performance.total_ms as f64);
        metrics::counter!("search_requests_total").increment(1);

        Ok(outcome)
    }

    async fn focused_search(
        &self,
        analysis: &QueryAnalysis,
        top_k: usize,
    ) -> Result<SearchOutcome, SearchError> {
        let prefilter_result = self
            .prefilter
            .get_candidates(analysis, self.config.max_candidates)
            .await?;

        if prefilter_result.ids.is_empty() {
            tracing::warn!("prefilter returned no candidates, using dense-only fallback");
            return self.fallback_search(analysis, top_k).await;
        }

        tracing::info!(
            candidates = prefilter_result.count,
            elapsed_ms = prefilter_result.search_time_ms,
            "prefilter produced candidates"
        );

        let candidate_docs = self.store.retrieve(&prefilter_result.ids).await?;

        // lexical and dense scoring fan out under the request's deadline
        let bm25_engine = Arc::clone(&self.bm25);
        let bm25_keywords = analysis.keywords.clone();
        let bm25_docs = candidate_docs.clone();
        let bm25_language = analysis.language.clone();
        let bm25_semantic = analysis.semantic_query.clone();
        let bm25_started = Instant::now();
        let bm25_future = tokio::task::spawn_blocking(move || {
            bm25_engine.search_within_candidates(
                &bm25_keywords,
                &bm25_docs,
                &bm25_language,
                top_k,
                Some(&bm25_semantic),
            )
        });

        let dense_started = Instant::now();
        let dense_future = self.dense.search(
            &analysis.dense_query,
            Some(&prefilter_result.ids),
            top_k,
            None,
        );

        let (bm25_joined, dense_results) = tokio::join!(bm25_future, dense_future);
        let bm25_results =
            bm25_joined.map_err(|e| SearchError::Search(format!("bm25 task failed: {e}")))?;
        let dense_results = dense_results?;
        let bm25_ms = bm25_started.elapsed().as_millis() as u64;
        let dense_ms = dense_started.elapsed().as_millis() as u64;

        tracing::info!(
            bm25 = bm25_results.len(),
            dense = dense_results.len(),
            "focused scoring completed"
        );

        // fusion inputs are keyed by stage, whatever scorer the stage
        // fell back to internally
        let fusion_started = Instant::now();
        let mut results_by_source = HashMap::new();
        if !bm25_results.is_empty() {
            results_by_source.insert(sources::BM25_FOCUSED.to_string(), bm25_results);
        }
        if !dense_results.is_empty() {
            results_by_source.insert(sources::DENSE_FOCUSED.to_string(), dense_results);
        }

        let results = self.fusion.fuse(results_by_source, analysis, top_k, true);
        let fusion_ms = fusion_started.elapsed().as_millis() as u64;

        Ok(SearchOutcome {
            results,
            analysis: analysis.clone(),
            performance: SearchPerformance {
                total_ms: 0,
                prefilter_ms: prefilter_result.search_time_ms,
                bm25_ms,
                dense_ms,
                fusion_ms,
                prefilter_candidates: prefilter_result.count,
                strategy_used: prefilter_result.strategy_used,
                fallback_used: prefilter_result.fallback_used,
            },
            cache_info: self.cache_info(),
        })
    }

    /// Dense-only path used when no candidates survive the prefilter
    async fn fallback_search(
        &self,
        analysis: &QueryAnalysis,
        top_k: usize,
    ) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let results = self
            .dense
            .search(&analysis.dense_query, None, top_k, None)
            .await?;

        Ok(SearchOutcome {
            results,
            analysis: analysis.clone(),
            performance: SearchPerformance {
                total_ms: 0,
                prefilter_ms: 0,
                bm25_ms: 0,
                dense_ms: started.elapsed().as_millis() as u64,
                fusion_ms: 0,
                prefilter_candidates: 0,
                strategy_used: "fallback".to_string(),
                fallback_used: true,
            },
            cache_info: self.cache_info(),
        })
    }

    pub fn cache_info(&self) -> Value {
        json!({
            "bm25_cache": self.bm25.cache_stats(),
            "dense_cache": self.dense.cache_stats(),
            "prefilter_cache": self.prefilter.cache_stats(),
        })
    }

    /// Hit-rate banding across the stage caches
    pub fn cache_health(&self) -> Value {
        let bm25 = self.bm25.cache_stats();
        let dense = self.dense.cache_stats();
        let overall = (bm25.hit_rate + dense.hit_rate) / 2.0;

        let status = if overall > 70.0 {
            "excellent"
        } else if overall > 50.0 {
            "good"
        } else if overall > 30.0 {
            "fair"
        } else {
            "poor"
        };

        json!({
            "status": status,
            "overall_hit_rate": overall,
            "bm25_hit_rate": bm25.hit_rate,
            "dense_hit_rate": dense.hit_rate,
            "bm25_size": bm25.cache_size,
            "dense_size": dense.cache_size,
            "total_requests": bm25.total_requests + dense.total_requests,
        })
    }

    pub fn fusion_stats(&self) -> crate::fusion::FusionStats {
        self.fusion.stats()
    }

    pub fn clear_caches(&self) {
        self.bm25.clear_cache();
        self.dense.clear_cache();
        self.prefilter.clear_cache();
        tracing::info!("all retrieval caches cleared");
    }

    pub fn reset_cache_stats(&self) {
        self.bm25.reset_cache_stats();
        self.dense.reset_cache_stats();
    }
}

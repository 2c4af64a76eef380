//! Candidate pre-selection over the vector index
//!
//! Executes a metadata-filtered vector search returning ids only, with
//! an adaptive strategy ladder: text clauses are OR-ed with case
//! variants, boolean clauses are AND-ed, and empty results relax the
//! filter before retrying without one.

use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{
    condition::ConditionOneOf, Condition, FieldCondition, Filter, Match, RepeatedStrings,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tour_agent_cache::ResultCache;
use tour_agent_core::{FilterClause, FilterStrategy, QueryAnalysis};

use crate::models::ModelHolder;
use crate::vector_store::VectorStore;
use crate::SearchError;

/// Boolean fields kept by the moderate strategy
const MODERATE_PRIORITY: [&str; 4] = [
    "is_religious_site",
    "is_nature_tourism",
    "is_historical_site",
    "language",
];

/// Boolean fields kept by the loose strategy
const LOOSE_PRIORITY: [&str; 2] = ["is_religious_site", "language"];

/// Result of candidate pre-selection
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CandidateSet {
    pub ids: Vec<String>,
    pub count: usize,
    pub strategy_used: String,
    pub filters_applied: usize,
    pub search_time_ms: u64,
    pub fallback_used: bool,
    pub original_count: usize,
}

/// Pre-filtering engine for quality candidate retrieval
pub struct PreFilterEngine {
    store: Arc<VectorStore>,
    models: Arc<ModelHolder>,
    model_name: String,
    cache: ResultCache<CandidateSet>,
}

impl PreFilterEngine {
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

    /// Return at most `max` candidate ids for the analyzed query
    pub async fn get_candidates(
        &self,
        analysis: &QueryAnalysis,
        max: usize,
    ) -> Result<CandidateSet, SearchError> {
        let started = Instant::now();
        let cache_key = Self::cache_key(analysis, max);

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::info!(count = cached.count, "prefilter cache hit");
            return Ok(cached);
        }

        tracing::info!(
            strategy = analysis.filter_strategy.as_str(),
            "prefilter starting"
        );

        let vector = self.encode(&analysis.semantic_query).await?;
        let filter = build_filter(&analysis.filters, analysis.filter_strategy);
        let filters_applied = filter
            .as_ref()
            .map(|f| f.must.len() + f.should.len())
            .unwrap_or(0);

        let ids = self.search_ids(vector.clone(), filter, max).await?;
        let original_count = ids.len();

        let mut result = CandidateSet {
            count: ids.len(),
            ids,
            strategy_used: analysis.filter_strategy.as_str().to_string(),
            filters_applied,
            search_time_ms: started.elapsed().as_millis() as u64,
            fallback_used: false,
            original_count,
        };

        // Fallback ladder: relax to loose, then drop the filter entirely.
        if result.count == 0 && analysis.filter_strategy != FilterStrategy::Loose {
            tracing::warn!("no candidates found, applying fallback strategy");

            let loose_filter = build_filter(&analysis.filters, FilterStrategy::Loose);
            let loose_applied = loose_filter
                .as_ref()
                .map(|f| f.must.len() + f.should.len())
                .unwrap_or(0);
            let loose_ids = self.search_ids(vector.clone(), loose_filter, max).await?;

            if loose_ids.len() < 2 {
                tracing::info!("loose fallback yielded too few results, searching unfiltered");
                let open_ids = self.search_ids(vector, None, max).await?;
                result = CandidateSet {
                    count: open_ids.len(),
                    ids: open_ids,
                    strategy_used: "no_filters_fallback".to_string(),
                    filters_applied: 0,
                    search_time_ms: started.elapsed().as_millis() as u64,
                    fallback_used: true,
                    original_count,
                };
            } else {
                result = CandidateSet {
                    count: loose_ids.len(),
                    ids: loose_ids,
                    strategy_used: "loose_fallback".to_string(),
                    filters_applied: loose_applied,
                    search_time_ms: started.elapsed().as_millis() as u64,
                    fallback_used: true,
                    original_count,
                };
            }
        }

        self.cache.insert(cache_key, result.clone());
        tracing::info!(
            count = result.count,
            strategy = %result.strategy_used,
            elapsed_ms = result.search_time_ms,
            "prefilter completed"
        );
        Ok(result)
    }

    async fn encode(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        let model = self.models.get(&self.model_name).await?;
        model.encode(query).await
    }

    /// Id-only search; duplicates never survive
    async fn search_ids(
        &self,
        vector: Vec<f32>,
        filter: Option<Filter>,
        max: usize,
    ) -> Result<Vec<String>, SearchError> {
        let points = self.store.search(vector, filter, max, false).await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(points.len());
        for point in points {
            if seen.insert(point.id.clone()) {
                ids.push(point.id);
            }
        }
        ids.truncate(max);
        Ok(ids)
    }

    fn cache_key(analysis: &QueryAnalysis, max: usize) -> String {
        let mut filter_parts: Vec<String> =
            analysis.filters.iter().map(|f| format!("{f:?}")).collect();
        filter_parts.sort();

        let raw = format!(
            "{}|{}|{}|{}",
            analysis.original_query,
            analysis.filter_strategy.as_str(),
            max,
            filter_parts.join(";")
        );
        format!("{:x}", md5::compute(raw))
    }

    pub fn cache_stats(&self) -> tour_agent_cache::ResultCacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Lowercase, Title-case and UPPERCASE variants for case-insensitive
/// text matching
pub fn case_variants(text: &str) -> Vec<String> {
    let mut variants = vec![
        text.to_lowercase(),
        title_case(text),
        text.to_uppercase(),
    ];
    variants.sort();
    variants.dedup();
    variants
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_condition(key: &str, match_value: MatchValue) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(match_value),
            }),
            ..Default::default()
        })),
    }
}

/// Translate filter clauses into the store's filter grammar under the
/// given strategy. Text clauses combine with OR, booleans with AND.
pub fn build_filter(clauses: &[FilterClause], strategy: FilterStrategy) -> Option<Filter> {
    if clauses.is_empty() {
        return None;
    }

    let mut should = Vec::new();
    let mut must = Vec::new();

    let keep_boolean = |field: &str| match strategy {
        FilterStrategy::Strict => true,
        FilterStrategy::Moderate => MODERATE_PRIORITY.contains(&field),
        FilterStrategy::Loose => LOOSE_PRIORITY.contains(&field),
    };

    for clause in clauses {
        match clause {
            FilterClause::EntityMatch { variants } => {
                let mut expanded: Vec<String> =
                    variants.iter().flat_map(|v| case_variants(v)).collect();
                expanded.sort();
                expanded.dedup();

                should.push(field_condition(
                    "name",
                    MatchValue::Keywords(RepeatedStrings {
                        strings: expanded.clone(),
                    }),
                ));
                should.push(field_condition(
                    "tags",
                    MatchValue::Keywords(RepeatedStrings { strings: expanded }),
                ));
            }
            FilterClause::BoolFlag { field, value } => {
                if keep_boolean(field) {
                    must.push(field_condition(field, MatchValue::Boolean(*value)));
                }
            }
            FilterClause::LanguageIs { value } => {
                if keep_boolean("language") {
                    must.push(field_condition("language", MatchValue::Keyword(value.clone())));
                }
            }
        }
    }

    if should.is_empty() && must.is_empty() {
        tracing::debug!("no filters selected for strategy");
        return None;
    }

    tracing::info!(
        text = should.len(),
        boolean = must.len(),
        strategy = strategy.as_str(),
        "built prefilter"
    );

    Some(Filter {
        should,
        must,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_clause() -> FilterClause {
        FilterClause::EntityMatch {
            variants: vec!["svetitskhoveli".to_string(), "светицховели".to_string()],
        }
    }

    fn bool_clause(field: &str) -> FilterClause {
        FilterClause::BoolFlag {
            field: field.to_string(),
            value: true,
        }
    }

    #[test]
    fn test_case_variants() {
        let variants = case_variants("svetitskhoveli");
        assert!(variants.contains(&"svetitskhoveli".to_string()));
        assert!(variants.contains(&"Svetitskhoveli".to_string()));
        assert!(variants.contains(&"SVETITSKHOVELI".to_string()));
    }

    #[test]
    fn test_text_clauses_go_to_should_booleans_to_must() {
        let clauses = vec![entity_clause(), bool_clause("is_religious_site")];
        let filter = build_filter(&clauses, FilterStrategy::Strict).unwrap();

        // name + tags conditions
        assert_eq!(filter.should.len(), 2);
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn test_moderate_strategy_drops_non_priority_booleans() {
        let clauses = vec![
            bool_clause("is_religious_site"),
            bool_clause("has_processed_image"),
        ];
        let filter = build_filter(&clauses, FilterStrategy::Moderate).unwrap();
        assert_eq!(filter.must.len(), 1);

        let loose = build_filter(&clauses, FilterStrategy::Loose).unwrap();
        assert_eq!(loose.must.len(), 1);

        let strict = build_filter(&clauses, FilterStrategy::Strict).unwrap();
        assert_eq!(strict.must.len(), 2);
    }

    #[test]
    fn test_loose_strategy_keeps_language() {
        let clauses = vec![FilterClause::LanguageIs {
            value: "RU".to_string(),
        }];
        let filter = build_filter(&clauses, FilterStrategy::Loose).unwrap();
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn test_empty_clauses_build_no_filter() {
        assert!(build_filter(&[], FilterStrategy::Strict).is_none());
    }

    #[test]
    fn test_filtered_out_booleans_yield_no_filter() {
        let clauses = vec![bool_clause("has_processed_image")];
        assert!(build_filter(&clauses, FilterStrategy::Loose).is_none());
    }
}

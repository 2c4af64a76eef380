//! Rank-based fusion of the scoring stages
//!
//! Clean fusion handles the focused pipeline (prefiltered candidates);
//! legacy fusion remains for callers that hand in non-focused inputs.
//! Both normalize per-source scores, apply reciprocal-rank fusion and
//! contextual boosts, and annotate results with fusion bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tour_agent_core::{FusionInfo, QueryAnalysis, SearchResult};

/// Fusion statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct FusionStats {
    pub clean_fusions: u64,
    pub legacy_fusions: u64,
    pub total_fusions: u64,
}

struct DocScore {
    total_score: f32,
    source_scores: HashMap<String, f32>,
    rank_info: HashMap<String, usize>,
    result: SearchResult,
}

/// Reciprocal rank fusion engine
pub struct FusionEngine {
    k: f32,
    clean_fusions: AtomicU64,
    legacy_fusions: AtomicU64,
}

impl FusionEngine {
    pub fn new(k: f32) -> Self {
        Self {
            k,
            clean_fusions: AtomicU64::new(0),
            legacy_fusions: AtomicU64::new(0),
        }
    }

    /// Fuse per-source rankings into one final ranking
    pub fn fuse(
        &self,
        results_by_source: HashMap<String, Vec<SearchResult>>,
        analysis: &QueryAnalysis,
        top_k: usize,
        has_prefilter_info: bool,
    ) -> Vec<SearchResult> {
        let use_clean = Self::should_use_clean(&results_by_source, has_prefilter_info);

        let fused = if use_clean {
            tracing::info!("using clean fusion for prefiltered results");
            self.clean_fusions.fetch_add(1, Ordering::Relaxed);
            self.clean_fusion(results_by_source, analysis, top_k)
        } else {
            tracing::info!("using legacy fusion for mixed results");
            self.legacy_fusions.fetch_add(1, Ordering::Relaxed);
            self.legacy_fusion(results_by_source, analysis, top_k)
        };

        tracing::info!(results = fused.len(), clean = use_clean, "fusion completed");
        fused
    }

    fn should_use_clean(
        results_by_source: &HashMap<String, Vec<SearchResult>>,
        has_prefilter_info: bool,
    ) -> bool {
        let has_focused = results_by_source
            .iter()
            .any(|(source, results)| source.ends_with("_focused") && !results.is_empty());
        let has_main = results_by_source.iter().any(|(source, results)| {
            !results.is_empty()
                && matches!(source.as_str(), "bm25" | "bm25_focused" | "dense" | "dense_focused")
        });

        (has_focused || has_prefilter_info) && has_main
    }

    // --- clean fusion ---

    fn clean_fusion(
        &self,
        results_by_source: HashMap<String, Vec<SearchResult>>,
        analysis: &QueryAnalysis,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let weights = Self::focused_weights(&results_by_source);
        let normalized = Self::normalize_focused(results_by_source);
        let mut doc_scores = self.focused_rrf(normalized, &weights);
        Self::apply_focused_boosts(&mut doc_scores, analysis);
        Self::assemble(doc_scores, top_k, "clean")
    }

    /// Base weights intersected with the sources present, renormalized
    /// to sum to one
    fn focused_weights(
        results_by_source: &HashMap<String, Vec<SearchResult>>,
    ) -> HashMap<String, f32> {
        let base: HashMap<&str, f32> = HashMap::from([
            ("bm25", 0.4),
            ("bm25_focused", 0.45),
            ("bm25_simple_match", 0.45),
            ("dense", 0.5),
            ("dense_focused", 0.55),
            ("dense_standard", 0.5),
            ("metadata", 0.1),
        ]);

        let mut weights: HashMap<String, f32> = results_by_source
            .keys()
            .map(|source| {
                let weight = base.get(source.as_str()).copied().unwrap_or(0.3);
                (source.clone(), weight)
            })
            .collect();

        let total: f32 = weights.values().sum();
        if total > 0.0 {
            for weight in weights.values_mut() {
                *weight /= total;
            }
        }

        tracing::debug!(?weights, "focused fusion weights");
        weights
    }

    /// Per-source normalization preserving discriminability.
    /// BM25: 0.2 + 0.8·score/max for positive scores.
    /// Dense: min-max into [0.3, 1.0]; all-equal positives become 0.8.
    fn normalize_focused(
        results_by_source: HashMap<String, Vec<SearchResult>>,
    ) -> HashMap<String, Vec<SearchResult>> {
        results_by_source
            .into_iter()
            .map(|(source, mut results)| {
                if results.is_empty() {
                    return (source, results);
                }

                if source.contains("bm25") {
                    let max_score = results
                        .iter()
                        .map(|r| r.score)
                        .fold(f32::MIN, f32::max)
                        .max(f32::EPSILON);
                    for result in &mut results {
                        result.score = if result.score > 0.0 {
                            0.2 + 0.8 * (result.score / max_score)
                        } else {
                            0.0
                        };
                    }
                } else if source.contains("dense") {
                    let positive: Vec<f32> =
                        results.iter().map(|r| r.score).filter(|s| *s > 0.0).collect();
                    if !positive.is_empty() {
                        let max = positive.iter().copied().fold(f32::MIN, f32::max);
                        let min = positive.iter().copied().fold(f32::MAX, f32::min);

                        for result in &mut results {
                            result.score = if result.score <= 0.0 {
                                0.0
                            } else if max > min {
                                0.3 + 0.7 * ((result.score - min) / (max - min))
                            } else {
                                0.8
                            };
                        }
                    }
                } else {
                    let max_score = results.iter().map(|r| r.score).fold(f32::MIN, f32::max);
                    if max_score > 0.0 {
                        for result in &mut results {
                            result.score = if result.score > 0.0 {
                                0.1 + 0.9 * (result.score / max_score)
                            } else {
                                0.0
                            };
                        }
                    }
                }

                (source, results)
            })
            .collect()
    }

    /// RRF with position amplification: ranks 1/2/3 multiply by 3/2/1.5
    fn focused_rrf(
        &self,
        normalized: HashMap<String, Vec<SearchResult>>,
        weights: &HashMap<String, f32>,
    ) -> HashMap<String, DocScore> {
        let mut doc_scores: HashMap<String, DocScore> = HashMap::new();

        for (source, results) in normalized {
            let weight = weights.get(&source).copied().unwrap_or(0.5);

            for (idx, result) in results.into_iter().enumerate() {
                let rank = idx + 1;
                let base_rrf = 1.0 / (self.k + rank as f32);
                let mut final_score = weight * base_rrf * result.score * 10.0;

                final_score *= match rank {
                    1 => 3.0,
                    2 => 2.0,
                    3 => 1.5,
                    _ => 1.0,
                };

                let entry = doc_scores
                    .entry(result.doc_id.clone())
                    .or_insert_with(|| DocScore {
                        total_score: 0.0,
                        source_scores: HashMap::new(),
                        rank_info: HashMap::new(),
                        result,
                    });

                entry.total_score += final_score;
                entry.source_scores.insert(source.clone(), final_score);
                entry.rank_info.insert(source.clone(), rank);
            }
        }

        doc_scores
    }

    fn apply_focused_boosts(doc_scores: &mut HashMap<String, DocScore>, analysis: &QueryAnalysis) {
        for score_data in doc_scores.values_mut() {
            let payload = &score_data.result.payload;
            let mut boost = 1.0f32;

            if payload.language().eq_ignore_ascii_case(&analysis.language) {
                boost *= 1.2;
            }

            let source_count = score_data.source_scores.len();
            if source_count >= 2 {
                boost *= 1.0 + 0.3 * (source_count as f32 - 1.0);
            }

            let top_ranks = score_data.rank_info.values().filter(|r| **r <= 3).count();
            if top_ranks >= 2 {
                boost *= 1.5;
            }

            if payload.bool_field("is_fully_enriched") {
                boost *= 1.1;
            }

            let first_places = score_data.rank_info.values().filter(|r| **r == 1).count();
            if first_places >= 1 {
                boost *= 1.8;
            }

            score_data.total_score *= boost;
            score_data
                .source_scores
                .insert("__boost".to_string(), boost);
        }
    }

    // --- legacy fusion ---

    fn legacy_fusion(
        &self,
        results_by_source: HashMap<String, Vec<SearchResult>>,
        analysis: &QueryAnalysis,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let weights = Self::focused_weights(&results_by_source);
        let normalized = Self::normalize_legacy(results_by_source);
        let mut doc_scores = self.legacy_rrf(normalized, &weights);
        Self::apply_legacy_boosts(&mut doc_scores, analysis);
        Self::assemble(doc_scores, top_k, "legacy")
    }

    /// Log-compressed BM25, min-max dense into [0.1, 1.0]
    fn normalize_legacy(
        results_by_source: HashMap<String, Vec<SearchResult>>,
    ) -> HashMap<String, Vec<SearchResult>> {
        results_by_source
            .into_iter()
            .map(|(source, mut results)| {
                if source.contains("bm25") {
                    for result in &mut results {
                        result.score = if result.score > 0.0 {
                            (1.0 + result.score).ln() / (1.0f32 + 60.0).ln()
                        } else {
                            0.0
                        };
                    }
                } else if source.contains("dense") && !results.is_empty() {
                    let max = results.iter().map(|r| r.score).fold(f32::MIN, f32::max);
                    let min = results.iter().map(|r| r.score).fold(f32::MAX, f32::min);
                    if max > min {
                        for result in &mut results {
                            result.score = (result.score - min) / (max - min) * 0.9 + 0.1;
                        }
                    }
                }
                (source, results)
            })
            .collect()
    }

    /// Flat RRF without rank amplification
    fn legacy_rrf(
        &self,
        normalized: HashMap<String, Vec<SearchResult>>,
        weights: &HashMap<String, f32>,
    ) -> HashMap<String, DocScore> {
        let mut doc_scores: HashMap<String, DocScore> = HashMap::new();

        for (source, results) in normalized {
            let weight = weights.get(&source).copied().unwrap_or(0.0);

            for (idx, result) in results.into_iter().enumerate() {
                let rank = idx + 1;
                let rrf_score = weight / (self.k + rank as f32);

                let entry = doc_scores
                    .entry(result.doc_id.clone())
                    .or_insert_with(|| DocScore {
                        total_score: 0.0,
                        source_scores: HashMap::new(),
                        rank_info: HashMap::new(),
                        result,
                    });

                entry.total_score += rrf_score;
                entry.source_scores.insert(source.clone(), rrf_score);
                entry.rank_info.insert(source.clone(), rank);
            }
        }

        doc_scores
    }

    fn apply_legacy_boosts(doc_scores: &mut HashMap<String, DocScore>, analysis: &QueryAnalysis) {
        for score_data in doc_scores.values_mut() {
            let payload = &score_data.result.payload;
            let mut boost = 1.0f32;

            if payload.language().eq_ignore_ascii_case(&analysis.language) {
                boost *= 1.1;
            }

            if payload.bool_field("is_fully_enriched") {
                boost *= 1.03;
            }

            if !analysis.entities.categories.is_empty() {
                let doc_category = payload.category().to_lowercase();
                if analysis
                    .entities
                    .categories
                    .iter()
                    .any(|c| doc_category.contains(c.as_str()))
                {
                    boost *= 1.2;
                }
            }

            score_data.total_score *= boost;
            score_data
                .source_scores
                .insert("__boost".to_string(), boost);
        }
    }

    // --- assembly ---

    fn assemble(
        doc_scores: HashMap<String, DocScore>,
        top_k: usize,
        fusion_type: &str,
    ) -> Vec<SearchResult> {
        let mut sorted: Vec<(String, DocScore)> = doc_scores.into_iter().collect();
        sorted.sort_by(|a, b| {
            b.1.total_score
                .partial_cmp(&a.1.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        sorted
            .into_iter()
            .take(top_k)
            .map(|(_, mut score_data)| {
                let boost = score_data
                    .source_scores
                    .remove("__boost")
                    .unwrap_or(1.0);

                let mut result = score_data.result;
                result.score = score_data.total_score;

                let info = FusionInfo {
                    sources_used: score_data.source_scores.keys().cloned().collect(),
                    source_scores: score_data.source_scores,
                    rank_info: score_data.rank_info,
                    boost_factor: boost,
                    fusion_type: fusion_type.to_string(),
                };
                info.attach(&mut result.payload);

                result
            })
            .collect()
    }

    pub fn stats(&self) -> FusionStats {
        let clean = self.clean_fusions.load(Ordering::Relaxed);
        let legacy = self.legacy_fusions.load(Ordering::Relaxed);
        FusionStats {
            clean_fusions: clean,
            legacy_fusions: legacy,
            total_fusions: clean + legacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_core::types::{payload_from_value, sources};
    use tour_agent_core::{
        FilterStrategy, QueryComplexity, QueryIntent,
    };

    fn analysis(language: &str) -> QueryAnalysis {
        QueryAnalysis {
            original_query: "test".to_string(),
            language: language.to_string(),
            intent: QueryIntent::Exploratory,
            entities: Default::default(),
            complexity: QueryComplexity::Simple,
            semantic_query: "test".to_string(),
            dense_query: "test".to_string(),
            keywords: vec![],
            filters: vec![],
            filter_strategy: FilterStrategy::Loose,
        }
    }

    fn result(id: &str, score: f32, source: &str, language: &str) -> SearchResult {
        SearchResult::new(
            id,
            score,
            source,
            payload_from_value(json!({
                "name": id,
                "description": "desc",
                "language": language,
            })),
        )
    }

    fn engine() -> FusionEngine {
        FusionEngine::new(3.0)
    }

    #[test]
    fn test_clean_fusion_selected_for_focused_sources() {
        let mut inputs = HashMap::new();
        inputs.insert(
            sources::BM25_FOCUSED.to_string(),
            vec![result("a", 5.0, sources::BM25_FOCUSED, "EN")],
        );

        let fused = engine().fuse(inputs, &analysis("en"), 10, false);
        assert_eq!(fused.len(), 1);

        let info = FusionInfo::from_payload(&fused[0].payload).unwrap();
        assert_eq!(info.fusion_type, "clean");
    }

    #[test]
    fn test_doc_in_both_sources_outranks_singles() {
        let mut inputs = HashMap::new();
        inputs.insert(
            sources::BM25_FOCUSED.to_string(),
            vec![
                result("both", 8.0, sources::BM25_FOCUSED, "EN"),
                result("bm25_only", 6.0, sources::BM25_FOCUSED, "EN"),
            ],
        );
        inputs.insert(
            sources::DENSE_FOCUSED.to_string(),
            vec![
                result("both", 0.9, sources::DENSE_FOCUSED, "EN"),
                result("dense_only", 0.7, sources::DENSE_FOCUSED, "EN"),
            ],
        );

        let fused = engine().fuse(inputs, &analysis("en"), 10, true);
        assert_eq!(fused[0].doc_id, "both");

        let info = FusionInfo::from_payload(&fused[0].payload).unwrap();
        assert_eq!(info.rank_info.len(), 2);
        // multi-source, top-3 twice, rank-1 somewhere: all boosts fire
        assert!(info.boost_factor > 2.0);
    }

    #[test]
    fn test_language_match_boost() {
        let mut ru_inputs = HashMap::new();
        ru_inputs.insert(
            sources::DENSE_FOCUSED.to_string(),
            vec![
                result("ru_doc", 0.9, sources::DENSE_FOCUSED, "RU"),
                result("en_doc", 0.9, sources::DENSE_FOCUSED, "EN"),
            ],
        );

        let fused = engine().fuse(ru_inputs, &analysis("ru"), 10, true);
        let ru_info = FusionInfo::from_payload(
            &fused.iter().find(|r| r.doc_id == "ru_doc").unwrap().payload,
        )
        .unwrap();
        let en_info = FusionInfo::from_payload(
            &fused.iter().find(|r| r.doc_id == "en_doc").unwrap().payload,
        )
        .unwrap();

        assert!(ru_info.boost_factor > en_info.boost_factor);
    }

    #[test]
    fn test_fusion_monotonicity() {
        // dominating doc: better rank and higher normalized score in
        // every present source
        let mut inputs = HashMap::new();
        inputs.insert(
            sources::BM25_FOCUSED.to_string(),
            vec![
                result("winner", 9.0, sources::BM25_FOCUSED, "EN"),
                result("loser", 4.0, sources::BM25_FOCUSED, "EN"),
            ],
        );
        inputs.insert(
            sources::DENSE_FOCUSED.to_string(),
            vec![
                result("winner", 0.95, sources::DENSE_FOCUSED, "EN"),
                result("loser", 0.5, sources::DENSE_FOCUSED, "EN"),
            ],
        );

        let fused = engine().fuse(inputs, &analysis("en"), 10, true);
        let winner = fused.iter().find(|r| r.doc_id == "winner").unwrap();
        let loser = fused.iter().find(|r| r.doc_id == "loser").unwrap();
        assert!(winner.score > loser.score);
    }

    #[test]
    fn test_equal_dense_scores_normalize_to_fixed_value() {
        let inputs = HashMap::from([(
            sources::DENSE_FOCUSED.to_string(),
            vec![
                result("a", 0.6, sources::DENSE_FOCUSED, "EN"),
                result("b", 0.6, sources::DENSE_FOCUSED, "EN"),
            ],
        )]);

        let normalized = FusionEngine::normalize_focused(inputs);
        for result in &normalized[sources::DENSE_FOCUSED] {
            assert!((result.score - 0.8).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_legacy_fusion_for_non_focused_inputs() {
        let mut inputs = HashMap::new();
        inputs.insert(
            "semantic".to_string(),
            vec![result("a", 0.5, "semantic", "EN")],
        );

        let fused = engine().fuse(inputs, &analysis("en"), 10, false);
        assert_eq!(fused.len(), 1);
        let info = FusionInfo::from_payload(&fused[0].payload).unwrap();
        assert_eq!(info.fusion_type, "legacy");
    }

    #[test]
    fn test_top_k_truncation() {
        let results: Vec<SearchResult> = (0..20)
            .map(|i| result(&format!("d{i}"), 1.0 / (i as f32 + 1.0), sources::DENSE_FOCUSED, "EN"))
            .collect();
        let inputs = HashMap::from([(sources::DENSE_FOCUSED.to_string(), results)]);

        let fused = engine().fuse(inputs, &analysis("en"), 5, true);
        assert_eq!(fused.len(), 5);
    }
}

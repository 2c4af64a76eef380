//! Lexical scoring within the candidate set
//!
//! Builds a transient, weighted searchable text per candidate document,
//! tokenizes it per language, and scores with Okapi BM25. Final ranked
//! results are cached keyed by the semantic query, so one cached run
//! can serve any candidate set.

use std::collections::HashMap;
use std::time::Duration;

use tour_agent_cache::{ResultCache, ResultCacheStats};
use tour_agent_core::types::sources;
use tour_agent_core::{Document, SearchResult};

use crate::tokenize;

/// Field weights for the searchable text
const FIELD_WEIGHTS: [(&str, f32); 4] = [
    ("name", 3.0),
    ("location", 2.0),
    ("category", 1.5),
    ("description", 1.0),
];

/// Candidate corpora at or below this size skip BM25 entirely
const SMALL_CORPUS: usize = 5;

/// BM25 engine with result caching
pub struct Bm25Engine {
    k1: f32,
    b: f32,
    cache: ResultCache<Vec<SearchResult>>,
}

impl Bm25Engine {
    pub fn new(k1: f32, b: f32, cache_max: usize, cache_ttl: Duration) -> Self {
        Self {
            k1,
            b,
            cache: ResultCache::new(cache_max, cache_ttl),
        }
    }

    /// Score candidates against the query keywords.
    ///
    /// `semantic_query` drives the cache key; a cached ranking is
    /// filtered down to the current candidate set before returning.
    pub fn search_within_candidates(
        &self,
        keywords: &[String],
        candidate_docs: &[Document],
        language: &str,
        top_k: usize,
        semantic_query: Option<&str>,
    ) -> Vec<SearchResult> {
        if candidate_docs.is_empty() || keywords.is_empty() {
            return Vec::new();
        }

        let cache_key = semantic_query.map(Self::cache_key);

        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key) {
                let candidate_ids: std::collections::HashSet<&str> =
                    candidate_docs.iter().map(|d| d.id.as_str()).collect();
                let filtered: Vec<SearchResult> = cached
                    .into_iter()
                    .filter(|r| candidate_ids.contains(r.doc_id.as_str()))
                    .collect();
                tracing::info!(results = filtered.len(), "bm25 cache hit");
                return filtered;
            }
            tracing::info!("bm25 cache miss, scoring candidates");
        }

        // transient corpus from the candidates
        let mut corpus: Vec<Vec<String>> = Vec::with_capacity(candidate_docs.len());
        let mut mapping: Vec<&Document> = Vec::with_capacity(candidate_docs.len());

        for doc in candidate_docs {
            let text = weighted_text(doc);
            let tokens = tokenize::tokenize(&text, language);
            if !tokens.is_empty() {
                corpus.push(tokens);
                mapping.push(doc);
            }
        }

        if corpus.is_empty() {
            tracing::warn!("failed to build bm25 corpus from candidates");
            return Vec::new();
        }

        if corpus.len() <= SMALL_CORPUS {
            tracing::info!(size = corpus.len(), "small corpus, using keyword matching");
            return simple_keyword_match(keywords, candidate_docs, top_k);
        }

        let scores = self.score_corpus(&corpus, keywords);

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let threshold = if corpus.len() <= 20 { -0.5 } else { 0.0 };

        let mut results: Vec<SearchResult> = ranked
            .into_iter()
            .take(top_k)
            .filter(|(_, score)| *score > threshold)
            .map(|(idx, score)| {
                SearchResult::new(
                    mapping[idx].id.clone(),
                    score,
                    sources::BM25_FOCUSED,
                    mapping[idx].payload.clone(),
                )
            })
            .collect();

        if results.is_empty() {
            tracing::info!("bm25 produced no results, falling back to keyword matching");
            results = simple_keyword_match(keywords, candidate_docs, top_k);
        }

        if let (Some(key), false) = (cache_key, results.is_empty()) {
            self.cache.insert(key, results.clone());
        }

        results
    }

    /// Okapi BM25 over the transient corpus
    fn score_corpus(&self, corpus: &[Vec<String>], keywords: &[String]) -> Vec<f32> {
        let n = corpus.len() as f32;
        let avgdl = corpus.iter().map(|d| d.len()).sum::<usize>() as f32 / n;

        // document frequency per query term
        let mut df: HashMap<&str, usize> = HashMap::new();
        for term in keywords {
            let count = corpus
                .iter()
                .filter(|doc| doc.iter().any(|t| t == term))
                .count();
            df.insert(term.as_str(), count);
        }

        corpus
            .iter()
            .map(|doc| {
                let dl = doc.len() as f32;
                let mut score = 0.0f32;

                for term in keywords {
                    let freq = doc.iter().filter(|t| *t == term).count() as f32;
                    if freq == 0.0 {
                        continue;
                    }

                    let term_df = df[term.as_str()] as f32;
                    let idf = ((n - term_df + 0.5) / (term_df + 0.5) + 1.0).ln();
                    let saturation = (freq * (self.k1 + 1.0))
                        / (freq + self.k1 * (1.0 - self.b + self.b * dl / avgdl));

                    score += idf * saturation;
                }

                score
            })
            .collect()
    }

    fn cache_key(semantic_query: &str) -> String {
        let normalized = semantic_query.trim().to_lowercase();
        format!("bm25:{:x}", md5::compute(format!("bm25:{normalized}")))
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

/// Searchable text with field weights expressed by repetition
fn weighted_text(doc: &Document) -> String {
    let mut parts = Vec::new();
    for (field, weight) in FIELD_WEIGHTS {
        if let Some(content) = doc.payload.str_field(field) {
            if !content.is_empty() {
                for _ in 0..(weight as usize) {
                    parts.push(content);
                }
            }
        }
    }
    parts.join(" ")
}

/// Keyword hit-ratio scoring for small corpora
fn simple_keyword_match(
    keywords: &[String],
    candidate_docs: &[Document],
    top_k: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidate_docs
        .iter()
        .filter_map(|doc| {
            let text = weighted_text(doc).to_lowercase();
            let matches = keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .count();

            if matches == 0 {
                return None;
            }

            let score = matches as f32 / keywords.len() as f32 * 10.0;
            Some(SearchResult::new(
                doc.id.clone(),
                score,
                sources::BM25_SIMPLE_MATCH,
                doc.payload.clone(),
            ))
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_core::types::payload_from_value;

    fn doc(id: &str, name: &str, description: &str) -> Document {
        Document::new(
            id,
            payload_from_value(json!({
                "name": name,
                "description": description,
                "location": "Tbilisi, Georgia",
                "category": "attraction",
            })),
        )
    }

    fn engine() -> Bm25Engine {
        Bm25Engine::new(1.2, 0.75, 100, Duration::from_secs(60))
    }

    #[test]
    fn test_small_corpus_uses_keyword_matching() {
        let docs = vec![
            doc("1", "Narikala Fortress", "Ancient fortress above the old town"),
            doc("2", "Bridge of Peace", "Modern glass bridge"),
        ];
        let keywords = vec!["fortress".to_string()];

        let results =
            engine().search_within_candidates(&keywords, &docs, "en", 5, Some("fortress query"));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "1");
        assert_eq!(results[0].source, sources::BM25_SIMPLE_MATCH);
        // one of one keywords matched
        assert!((results[0].score - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bm25_ranks_matching_doc_first() {
        let mut docs: Vec<Document> = (0..8)
            .map(|i| doc(&format!("filler-{i}"), "Museum", "a museum of local history"))
            .collect();
        docs.push(doc(
            "target",
            "Svetitskhoveli Cathedral",
            "cathedral cathedral cathedral in Mtskheta",
        ));

        // analyzer keywords arrive stemmed, same as the corpus tokens
        let keywords = tokenize::tokenize("cathedral", "en");
        let results = engine().search_within_candidates(&keywords, &docs, "en", 5, None);

        assert!(!results.is_empty());
        assert_eq!(results[0].doc_id, "target");
        assert_eq!(results[0].source, sources::BM25_FOCUSED);
    }

    #[test]
    fn test_cached_result_filtered_to_new_candidate_set() {
        let engine = engine();
        let docs: Vec<Document> = (0..7)
            .map(|i| doc(&format!("d{i}"), "Fortress", "old stone fortress walls"))
            .collect();
        let keywords = vec!["fortress".to_string()];

        let first =
            engine.search_within_candidates(&keywords, &docs, "en", 10, Some("fortress tour"));
        assert!(!first.is_empty());

        // narrower candidate set served from cache
        let narrow = &docs[0..1];
        let second =
            engine.search_within_candidates(&keywords, narrow, "en", 10, Some("fortress tour"));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].doc_id, "d0");

        let stats = engine.cache_stats();
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn test_empty_inputs() {
        let engine = engine();
        assert!(engine
            .search_within_candidates(&[], &[doc("1", "x", "y")], "en", 5, None)
            .is_empty());
        assert!(engine
            .search_within_candidates(&["a".to_string()], &[], "en", 5, None)
            .is_empty());
    }
}

//! End-to-end answer flow
//!
//! detect → (maybe translate) → analyze the original → retrieve with
//! the translated query → optionally enrich → assemble → generate in
//! the target language → persist to the conversation.
//!
//! The endpoint always returns a well-formed answer: any failing step
//! produces a localized error reply and the request finalizes
//! successfully from the caller's point of view.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

use tour_agent_cache::CacheStore;
use tour_agent_config::constants::namespaces;
use tour_agent_conversation::{ContextWindow, ConversationStore};
use tour_agent_core::{Error, Language, MessageRole, QueryIntent, SearchResult};
use tour_agent_enrichment::WebEnrichmentEngine;
use tour_agent_llm::prompt::rephrase_message;
use tour_agent_llm::ResponseGenerator;
use tour_agent_multilingual::MultilingualManager;
use tour_agent_search::{HybridSearchEngine, QueryAnalyzer};
use tour_agent_worker::TaskQueue;

use crate::context::{ContextAssembler, QueryRouting};

/// A source entry in the answer
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub id: String,
    pub name: String,
    pub location: String,
    pub score: f32,
    pub category: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

/// The complete answer returned to the surface layer
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub response: String,
    pub language: Language,
    pub sources: Vec<AnswerSource>,
    pub conversation_id: Option<String>,
    pub error: bool,
    pub metadata: Value,
}

/// Options for one question
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub target_language: Option<Language>,
    pub conversation_id: Option<String>,
    pub enable_enrichment: bool,
    pub top_k: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            target_language: None,
            conversation_id: None,
            enable_enrichment: true,
            top_k: 5,
        }
    }
}

/// The RAG entry point owning all collaborators
pub struct TourismRag {
    multilingual: Arc<MultilingualManager>,
    search: Arc<HybridSearchEngine>,
    enrichment: Option<Arc<WebEnrichmentEngine>>,
    analyzer: QueryAnalyzer,
    assembler: ContextAssembler,
    generator: Arc<ResponseGenerator>,
    conversations: Arc<ConversationStore>,
    cache: Arc<CacheStore>,
    worker_queue: Arc<TaskQueue>,
}

impl TourismRag {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        multilingual: Arc<MultilingualManager>,
        search: Arc<HybridSearchEngine>,
        enrichment: Option<Arc<WebEnrichmentEngine>>,
        generator: Arc<ResponseGenerator>,
        conversations: Arc<ConversationStore>,
        cache: Arc<CacheStore>,
        worker_queue: Arc<TaskQueue>,
    ) -> Self {
        Self {
            multilingual,
            search,
            enrichment,
            analyzer: QueryAnalyzer::default(),
            assembler: ContextAssembler::new(),
            generator,
            conversations,
            cache,
            worker_queue,
        }
    }

    /// Answer one question in any of the 18 supported languages
    pub async fn answer(&self, query: &str, options: AnswerOptions) -> Answer {
        let started = Instant::now();

        if query.trim().is_empty() {
            let language = options.target_language.unwrap_or_default();
            return Answer {
                response: rephrase_message(language).to_string(),
                language,
                sources: Vec::new(),
                conversation_id: options.conversation_id,
                error: true,
                metadata: json!({
                    "error_type": "invalid_input",
                    "processing_time": started.elapsed().as_secs_f64(),
                }),
            };
        }

        let detected = self.multilingual.detect_language(query).await;
        let target = options.target_language.unwrap_or(detected);

        match self.answer_inner(query, detected, target, &options, started).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(%err, "answer pipeline failed");
                metrics::counter!("rag_errors_total").increment(1);
                Answer {
                    response: tour_agent_llm::prompt::error_message(target).to_string(),
                    language: target,
                    sources: Vec::new(),
                    conversation_id: options.conversation_id.clone(),
                    error: true,
                    metadata: json!({
                        "error_type": err.kind(),
                        "detected_language": detected.code(),
                        "processing_time": started.elapsed().as_secs_f64(),
                    }),
                }
            }
        }
    }

    async fn answer_inner(
        &self,
        query: &str,
        detected: Language,
        target: Language,
        options: &AnswerOptions,
        started: Instant,
    ) -> Result<Answer, Error> {
        tracing::info!(
            query = %query.chars().take(100).collect::<String>(),
            detected = %detected,
            target = %target,
            "processing question"
        );

        // translation gate: queries only, best-effort
        let mut search_query = query.to_string();
        let mut query_was_translated = false;
        if self.multilingual.should_translate_for_search(detected) {
            let translated = self.multilingual.translate_query(query, detected).await;
            if translated != query {
                query_was_translated = true;
                search_query = translated;
            }
        }

        // intent and the enrichment gate come from the ORIGINAL query;
        // the retrieval stages re-analyze the translated one internally
        let analysis = self.analyzer.analyze(query);
        let intent = analysis.intent;
        let query_wants_enrichment = wants_enrichment(query, intent, &analysis.entities.locations);

        let outcome = self.search.search(&search_query, options.top_k).await?;

        // conversation context before the search results are shaped
        let conversation_history = match &options.conversation_id {
            Some(id) => {
                let ContextWindow::Text(text) =
                    self.conversations.context_window(id, 2000, false).await
                else {
                    unreachable!("text window requested");
                };
                (!text.is_empty()).then_some(text)
            }
            None => None,
        };

        if let Some(conversation_id) = &options.conversation_id {
            let mut meta = Map::new();
            meta.insert("language".to_string(), json!(detected.code()));
            meta.insert("intent".to_string(), json!(intent.as_str()));
            self.conversations
                .add_message(conversation_id, MessageRole::User, query, meta)
                .await;
        }

        // optional enrichment, gated on the query and on result sparsity
        let enrichment = match (&self.enrichment, options.enable_enrichment) {
            (Some(engine), true)
                if query_wants_enrichment
                    && WebEnrichmentEngine::needs_enrichment(&outcome.results) =>
            {
                match engine.enrich(&outcome.results, detected.code()).await {
                    Ok(result) if !result.is_empty() => Some(result),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::warn!(%err, "enrichment degraded to none");
                        None
                    }
                }
            }
            _ => None,
        };

        let routing = QueryRouting {
            original_query: query.to_string(),
            search_query: search_query.clone(),
            detected_language: detected,
            target_language: target,
            query_was_translated,
            intent,
        };

        let context = self.assembler.assemble(
            &outcome.results,
            &routing,
            enrichment.as_ref(),
            conversation_history,
        );

        let generated = self.generator.generate(&context).await;

        if let Some(conversation_id) = &options.conversation_id {
            let source_ids: Vec<&str> = outcome
                .results
                .iter()
                .take(3)
                .map(|r| r.doc_id.as_str())
                .collect();
            let mut meta = Map::new();
            meta.insert("language".to_string(), json!(target.code()));
            meta.insert("sources".to_string(), json!(source_ids));
            self.conversations
                .add_message(
                    conversation_id,
                    MessageRole::Assistant,
                    generated.response.clone(),
                    meta,
                )
                .await;
        }

        let sources = self.shape_sources(&outcome.results);
        let processing_time = started.elapsed().as_secs_f64();

        metrics::counter!("rag_requests_total").increment(1);
        metrics::histogram!("rag_duration_seconds").record(processing_time);

        let metadata = json!({
            "detected_language": detected.code(),
            "target_language": target.code(),
            "query_was_translated": query_was_translated,
            "search_query": query_was_translated.then_some(&search_query),
            "search_results_count": outcome.results.len(),
            "enrichment_enabled": options.enable_enrichment,
            "enrichment_sources": enrichment
                .as_ref()
                .map(|e| e.enrichment_sources.clone())
                .unwrap_or_default(),
            "processing_time": processing_time,
            "model_used": generated.model,
            "total_tokens": generated.input_tokens + generated.output_tokens,
            "with_disclaimer": generated.with_disclaimer,
            "translation_service": query_was_translated.then_some("groq"),
            "error_type": generated.error,
            "performance": outcome.performance,
            "intent": intent.as_str(),
        });

        tracing::info!(
            processing_time,
            detected = %detected,
            target = %target,
            translated = query_was_translated,
            "question processed"
        );

        Ok(Answer {
            response: generated.response,
            language: target,
            sources,
            conversation_id: options.conversation_id.clone(),
            error: false,
            metadata,
        })
    }

    fn shape_sources(&self, results: &[SearchResult]) -> Vec<AnswerSource> {
        results
            .iter()
            .take(5)
            .map(|result| AnswerSource {
                id: result.doc_id.clone(),
                name: result.payload.name().to_string(),
                location: self.assembler.location_of(result),
                score: result.score,
                category: result.payload.category().to_string(),
                image_url: result.payload.image_url().map(str::to_string),
                description: {
                    let description = result.payload.description();
                    (!description.is_empty())
                        .then(|| description.chars().take(200).collect::<String>())
                },
            })
            .collect()
    }

    /// Process several questions concurrently
    pub async fn answer_batch(&self, queries: &[String], options: AnswerOptions) -> Vec<Answer> {
        tracing::info!(count = queries.len(), "processing batch");
        let futures = queries
            .iter()
            .map(|query| self.answer(query, options.clone()));
        futures::future::join_all(futures).await
    }

    /// Component readiness plus cache and queue stats
    pub fn system_status(&self) -> Value {
        json!({
            "components": {
                "multilingual": true,
                "hybrid_search": true,
                "enrichment": self.enrichment.is_some(),
                "generator": true,
                "conversations": true,
            },
            "cache_stats": self.cache.stats(),
            "search_caches": self.search.cache_info(),
            "cache_health": self.search.cache_health(),
            "queue_status": self.worker_queue.stats(),
            "conversation_stats": self.conversations.stats(),
            "translation_stats": self.multilingual.stats(),
        })
    }

    /// Clear the temporary cache namespaces and the stage caches.
    /// Permanent tiers are untouched.
    pub async fn clear_temporary_caches(&self) -> usize {
        let mut cleared = 0;
        for ns in namespaces::TEMPORARY {
            cleared += self.cache.clear_namespace(ns).await;
        }
        self.search.clear_caches();
        tracing::info!(cleared, "temporary caches cleared");
        cleared
    }

    pub fn search_engine(&self) -> &HybridSearchEngine {
        &self.search
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }
}

/// Query-side enrichment gate: current-info questions, open
/// recommendations and place-info requests warrant outbound fetches.
fn wants_enrichment(query: &str, intent: QueryIntent, locations: &[String]) -> bool {
    let lowered = query.to_lowercase();

    const CURRENT_INFO: [&str; 12] = [
        "price", "cost", "hours", "open", "closed", "ticket", "цена", "стоимость", "часы",
        "открыт", "закрыт", "билет",
    ];
    if CURRENT_INFO.iter().any(|k| lowered.contains(k)) {
        return true;
    }

    if intent == QueryIntent::Exploratory && locations.is_empty() {
        return true;
    }

    if intent == QueryIntent::Navigational {
        return true;
    }

    const INFO_TOPICS: [&str; 24] = [
        "пляж", "beach", "озеро", "lake", "гора", "mountain", "монастырь", "monastery",
        "церковь", "church", "крепость", "fortress", "парк", "park", "музей", "museum",
        "площадь", "square", "расскажи", "tell", "покажи", "show", "что такое", "what is",
    ];
    if intent == QueryIntent::Factual && INFO_TOPICS.iter().any(|k| lowered.contains(k)) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_info_queries_want_enrichment() {
        assert!(wants_enrichment(
            "сколько стоит билет в Вардзию",
            QueryIntent::Factual,
            &[]
        ));
        assert!(wants_enrichment(
            "opening hours of Narikala",
            QueryIntent::Factual,
            &[]
        ));
    }

    #[test]
    fn test_open_recommendation_wants_enrichment() {
        assert!(wants_enrichment(
            "something beautiful",
            QueryIntent::Exploratory,
            &[]
        ));
        // a concrete location was already extracted
        assert!(!wants_enrichment(
            "something beautiful",
            QueryIntent::Exploratory,
            &["батуми".to_string()]
        ));
    }

    #[test]
    fn test_route_planning_always_wants_enrichment() {
        assert!(wants_enrichment("дорога", QueryIntent::Navigational, &[]));
    }

    #[test]
    fn test_comparative_does_not() {
        assert!(!wants_enrichment(
            "similar to vardzia",
            QueryIntent::Comparative,
            &[]
        ));
    }
}

//! Context assembly
//!
//! Shapes fused results and enrichment into the generator's input
//! struct. Documents are never translated here: they stay in their
//! RU/EN original, and the generator produces the target language.

use tour_agent_core::{Language, QueryIntent, SearchResult};
use tour_agent_enrichment::{EnrichmentResult, LocationExtractor};
use tour_agent_llm::generator::{
    AnswerContext, ContextImage, ContextResult, EnrichmentBlock, QueryInfo,
};

/// Maximum results shaped into the context
const MAX_RESULTS: usize = 5;

/// Routing facts the assembler needs from the entry point
#[derive(Debug, Clone)]
pub struct QueryRouting {
    pub original_query: String,
    pub search_query: String,
    pub detected_language: Language,
    pub target_language: Language,
    pub query_was_translated: bool,
    pub intent: QueryIntent,
}

/// Assembles the generator context from retrieval output
pub struct ContextAssembler {
    location_extractor: LocationExtractor,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self {
            location_extractor: LocationExtractor::new(),
        }
    }

    pub fn assemble(
        &self,
        results: &[SearchResult],
        routing: &QueryRouting,
        enrichment: Option<&EnrichmentResult>,
        conversation_history: Option<String>,
    ) -> AnswerContext {
        let mut shaped = Vec::new();
        let mut images = Vec::new();

        for (idx, result) in results.iter().take(MAX_RESULTS).enumerate() {
            let payload = &result.payload;
            let location = self.location_extractor.extract(payload);

            let image_url = payload.image_url().map(str::to_string);
            let has_image = payload.has_image();

            if let Some(url) = &image_url {
                images.push(ContextImage {
                    place: payload.name().to_string(),
                    url: url.clone(),
                    source: "corpus".to_string(),
                    photographer: None,
                });
            }

            shaped.push(ContextResult {
                rank: idx + 1,
                name: payload.name().to_string(),
                description: describe(result),
                category: payload.category().to_string(),
                location: location.primary_location,
                location_full: payload.location().to_string(),
                tags: payload.tags().into_iter().take(10).collect(),
                score: result.score,
                has_image,
                image_url,
                original_language: payload.language().to_string(),
            });
        }

        // enrichment images come after corpus images, deduplicated
        if let Some(enrichment) = enrichment {
            for image in enrichment.unsplash_images.iter().take(3) {
                if !images.iter().any(|existing| existing.url == image.url) {
                    images.push(ContextImage {
                        place: "Georgia".to_string(),
                        url: image.url.clone(),
                        source: "unsplash".to_string(),
                        photographer: Some(image.photographer.clone()),
                    });
                }
            }
        }

        let results_with_images = shaped.iter().filter(|r| r.has_image).count();

        let enrichment_block = enrichment.filter(|e| !e.is_empty()).map(|e| EnrichmentBlock {
            summary: e.wikipedia_content.clone(),
            sources: e.enrichment_sources.clone(),
            additional_images: e.unsplash_images.len(),
        });

        tracing::info!(
            results = shaped.len(),
            images = images.len(),
            detected = %routing.detected_language,
            target = %routing.target_language,
            "context assembled, documents kept untranslated"
        );

        AnswerContext {
            query_info: QueryInfo {
                original_query: routing.original_query.clone(),
                search_query: routing.search_query.clone(),
                detected_language: routing.detected_language,
                target_language: routing.target_language,
                query_was_translated: routing.query_was_translated,
                intent: routing.intent,
            },
            total_results: results.len(),
            results_with_images,
            search_results: shaped,
            enrichment: enrichment_block,
            images,
            conversation_history,
        }
    }

    pub fn location_of(&self, result: &SearchResult) -> String {
        self.location_extractor.extract(&result.payload).primary_location
    }
}

/// Description preference: payload description, then stage content
fn describe(result: &SearchResult) -> String {
    let description = result.payload.description();
    if !description.is_empty() {
        description.to_string()
    } else {
        result.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_core::types::{payload_from_value, sources};
    use tour_agent_enrichment::UnsplashImage;

    fn routing() -> QueryRouting {
        QueryRouting {
            original_query: "მითხარი თბილისის შესახებ".to_string(),
            search_query: "tell me about tbilisi".to_string(),
            detected_language: Language::Ka,
            target_language: Language::Ka,
            query_was_translated: true,
            intent: QueryIntent::Factual,
        }
    }

    fn result(id: &str, name: &str, image: Option<&str>) -> SearchResult {
        let mut payload = json!({
            "name": name,
            "description": "Старая крепость над городом",
            "location": "Tbilisi, Georgia",
            "category": "fortress",
            "language": "RU",
            "tags": ["fortress", "tbilisi", "history"],
        });
        if let Some(url) = image {
            payload["image_url"] = json!(url);
        }
        SearchResult::new(id, 1.5, sources::DENSE_FOCUSED, payload_from_value(payload))
    }

    #[test]
    fn test_assemble_shapes_top_results() {
        let results: Vec<SearchResult> = (0..8)
            .map(|i| result(&format!("d{i}"), &format!("Place {i}"), None))
            .collect();

        let context = ContextAssembler::new().assemble(&results, &routing(), None, None);

        assert_eq!(context.search_results.len(), 5);
        assert_eq!(context.total_results, 8);
        assert_eq!(context.search_results[0].rank, 1);
        assert_eq!(context.search_results[0].location, "Tbilisi");
        // untranslated: original Russian description survives
        assert!(context.search_results[0]
            .description
            .contains("Старая крепость"));
        assert_eq!(context.search_results[0].original_language, "RU");
    }

    #[test]
    fn test_corpus_image_first_then_enrichment_dedup() {
        let results = vec![result("d1", "Narikala", Some("https://cdn/narikala.jpg"))];
        let enrichment = EnrichmentResult {
            unsplash_images: vec![
                UnsplashImage {
                    url: "https://cdn/narikala.jpg".to_string(),
                    thumbnail: String::new(),
                    photographer: "someone".to_string(),
                    alt: None,
                },
                UnsplashImage {
                    url: "https://unsplash/extra.jpg".to_string(),
                    thumbnail: String::new(),
                    photographer: "else".to_string(),
                    alt: None,
                },
            ],
            enrichment_sources: vec!["unsplash".to_string()],
            ..Default::default()
        };

        let context =
            ContextAssembler::new().assemble(&results, &routing(), Some(&enrichment), None);

        assert_eq!(context.images.len(), 2);
        assert_eq!(context.images[0].source, "corpus");
        assert_eq!(context.images[1].url, "https://unsplash/extra.jpg");
    }

    #[test]
    fn test_empty_enrichment_not_attached() {
        let results = vec![result("d1", "Narikala", None)];
        let empty = EnrichmentResult::default();
        let context = ContextAssembler::new().assemble(&results, &routing(), Some(&empty), None);
        assert!(context.enrichment.is_none());
    }
}

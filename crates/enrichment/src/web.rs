//! Web enrichment engine
//!
//! Gates third-party fetches on description/image sparsity of the top
//! results, reads and writes the permanent cache tier, and queues
//! vector-store write-backs through the worker pool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use tour_agent_cache::CacheStore;
use tour_agent_config::constants::namespaces;
use tour_agent_config::EnrichmentConfig;
use tour_agent_core::{Payload, SearchResult};

use crate::persister::EnrichmentPersister;
use crate::sources::{SerpApiClient, UnsplashClient, UnsplashImage, WikipediaClient};
use crate::EnrichmentError;

/// Descriptions shorter than this trigger enrichment
const SHORT_DESCRIPTION: usize = 300;

/// Result of web enrichment for one place group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub wikipedia_content: String,
    pub wikipedia_images: Vec<String>,
    pub unsplash_images: Vec<UnsplashImage>,
    pub serpapi_results: Vec<Value>,
    pub enrichment_sources: Vec<String>,
    pub cache_key: Option<String>,
}

impl EnrichmentResult {
    pub fn is_empty(&self) -> bool {
        self.enrichment_sources.is_empty()
    }
}

/// Web enrichment with permanent caching and background write-backs
pub struct WebEnrichmentEngine {
    wikipedia: Option<WikipediaClient>,
    unsplash: Option<UnsplashClient>,
    serpapi: Option<SerpApiClient>,
    cache: Arc<CacheStore>,
    persister: Option<Arc<EnrichmentPersister>>,
    fetch_timeout: Duration,
}

impl WebEnrichmentEngine {
    pub fn new(
        config: &EnrichmentConfig,
        cache: Arc<CacheStore>,
        persister: Option<Arc<EnrichmentPersister>>,
    ) -> Self {
        let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);

        let wikipedia = WikipediaClient::new(fetch_timeout)
            .map_err(|err| tracing::warn!(%err, "wikipedia client unavailable"))
            .ok();
        let unsplash = config.unsplash_access_key.as_ref().and_then(|key| {
            UnsplashClient::new(key.clone(), fetch_timeout)
                .map_err(|err| tracing::warn!(%err, "unsplash client unavailable"))
                .ok()
        });
        let serpapi = config.serpapi_api_key.as_ref().and_then(|key| {
            SerpApiClient::new(key.clone(), fetch_timeout)
                .map_err(|err| tracing::warn!(%err, "serpapi client unavailable"))
                .ok()
        });

        tracing::info!(
            wikipedia = wikipedia.is_some(),
            unsplash = unsplash.is_some(),
            serpapi = serpapi.is_some(),
            write_back = persister.is_some(),
            "web enrichment engine initialized"
        );

        Self {
            wikipedia,
            unsplash,
            serpapi,
            cache,
            persister,
            fetch_timeout,
        }
    }

    /// Whether the top results are sparse enough to warrant enrichment
    pub fn needs_enrichment(results: &[SearchResult]) -> bool {
        let top = &results[..results.len().min(3)];
        top.iter().any(|r| needs_description(&r.payload)) || top.iter().any(|r| needs_images(&r.payload))
    }

    /// Enrich the top results. Two-tier lookup before any outbound
    /// call: permanent cache, then the top document's own payload.
    pub async fn enrich(
        &self,
        results: &[SearchResult],
        query_language: &str,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        if results.is_empty() {
            return Ok(EnrichmentResult::default());
        }

        let top = &results[..results.len().min(3)];
        let needs_description_fetch = top.iter().any(|r| needs_description(&r.payload));
        let needs_image_fetch = top.iter().any(|r| needs_images(&r.payload));

        if !needs_description_fetch && !needs_image_fetch {
            tracing::debug!("top results are rich, skipping enrichment");
            return Ok(EnrichmentResult::default());
        }

        let place_names: Vec<&str> = top.iter().map(|r| r.payload.name()).collect();
        let cache_key = format!("{:x}", md5::compute(place_names.join("|")));
        let primary_place = place_names.first().copied().unwrap_or("Unknown").to_string();

        // level 1: permanent cache
        if let Some(cached) = self
            .cache
            .get::<EnrichmentResult>(namespaces::ENRICHMENT_PERMANENT, &cache_key)
            .await
        {
            tracing::info!(place = %primary_place, "permanent enrichment cache hit");
            return Ok(cached);
        }

        // level 2: the document's own payload
        let top_doc = &results[0];
        if top_doc.payload.is_enriched() {
            let from_payload = result_from_payload(&top_doc.payload, &cache_key);
            if !from_payload.is_empty() {
                tracing::info!(place = %primary_place, "payload enrichment hit");
                self.cache
                    .set_permanent(namespaces::ENRICHMENT_PERMANENT, &cache_key, &from_payload)
                    .await;
                return Ok(from_payload);
            }
        }

        tracing::info!(place = %primary_place, "fetching enrichment from the web");

        let wikipedia_future = async {
            match (&self.wikipedia, needs_description_fetch) {
                (Some(client), true) => {
                    tokio::time::timeout(self.fetch_timeout, client.summary(&primary_place))
                        .await
                        .unwrap_or_default()
                }
                _ => Default::default(),
            }
        };

        let serpapi_future = async {
            match (&self.serpapi, needs_description_fetch) {
                (Some(client), true) => tokio::time::timeout(
                    self.fetch_timeout,
                    client.search(&primary_place, query_language),
                )
                .await
                .unwrap_or_default(),
                _ => Vec::new(),
            }
        };

        let unsplash_future = async {
            match (&self.unsplash, needs_image_fetch) {
                (Some(client), true) => {
                    tokio::time::timeout(self.fetch_timeout, client.search(&primary_place))
                        .await
                        .unwrap_or_default()
                }
                _ => Vec::new(),
            }
        };

        let (wikipedia, serpapi_results, unsplash_images) =
            tokio::join!(wikipedia_future, serpapi_future, unsplash_future);

        let mut sources = Vec::new();
        if !wikipedia.content.is_empty() {
            sources.push("wikipedia".to_string());
        }
        if !serpapi_results.is_empty() {
            sources.push("serpapi".to_string());
        }
        if !unsplash_images.is_empty() {
            sources.push("unsplash".to_string());
        }

        let enrichment = EnrichmentResult {
            wikipedia_content: wikipedia.content,
            wikipedia_images: wikipedia.images,
            unsplash_images,
            serpapi_results,
            enrichment_sources: sources,
            cache_key: Some(cache_key.clone()),
        };

        if !enrichment.is_empty() {
            self.cache
                .set_permanent(namespaces::ENRICHMENT_PERMANENT, &cache_key, &enrichment)
                .await;
            tracing::info!(place = %primary_place, sources = ?enrichment.enrichment_sources, "enrichment saved permanently");

            if let Some(persister) = &self.persister {
                persister.persist_async(top_doc.doc_id.clone(), enrichment.clone());
            }
        }

        Ok(enrichment)
    }
}

fn needs_description(payload: &Payload) -> bool {
    payload.description().trim().chars().count() < SHORT_DESCRIPTION
}

fn needs_images(payload: &Payload) -> bool {
    !payload.has_image()
}

/// Reconstruct an enrichment result from payload fields written by a
/// previous write-back
fn result_from_payload(payload: &Payload, cache_key: &str) -> EnrichmentResult {
    let unsplash_images: Vec<UnsplashImage> = payload
        .get("images_unsplash")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    EnrichmentResult {
        wikipedia_content: payload
            .str_field("description_enriched")
            .unwrap_or_default()
            .to_string(),
        wikipedia_images: payload.list_field("images_wikipedia"),
        unsplash_images,
        serpapi_results: Vec::new(),
        enrichment_sources: payload.list_field("enrichment_sources"),
        cache_key: Some(cache_key.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_core::types::{payload_from_value, sources};

    fn result_with(description: &str, image_url: Option<&str>) -> SearchResult {
        let mut payload = json!({
            "name": "Gremi Citadel",
            "description": description,
        });
        if let Some(url) = image_url {
            payload["image_url"] = json!(url);
        }
        SearchResult::new("doc-1", 0.9, sources::DENSE_FOCUSED, payload_from_value(payload))
    }

    fn engine(cache: Arc<CacheStore>) -> WebEnrichmentEngine {
        let config = EnrichmentConfig {
            enabled: true,
            unsplash_access_key: None,
            serpapi_api_key: None,
            fetch_timeout_secs: 1,
        };
        WebEnrichmentEngine::new(&config, cache, None)
    }

    #[test]
    fn test_gate_on_short_description() {
        let sparse = vec![result_with("short", None)];
        assert!(WebEnrichmentEngine::needs_enrichment(&sparse));

        let long_description = "x".repeat(400);
        let rich = vec![result_with(&long_description, Some("https://cdn/img.jpg"))];
        assert!(!WebEnrichmentEngine::needs_enrichment(&rich));
    }

    #[test]
    fn test_gate_on_missing_image() {
        let long_description = "x".repeat(400);
        let no_image = vec![result_with(&long_description, None)];
        assert!(WebEnrichmentEngine::needs_enrichment(&no_image));
    }

    #[tokio::test]
    async fn test_rich_results_make_zero_outbound_calls() {
        let cache = Arc::new(CacheStore::memory_only());
        let engine = engine(Arc::clone(&cache));

        let long_description = "x".repeat(400);
        let rich = vec![result_with(&long_description, Some("https://cdn/img.jpg"))];

        let enrichment = engine.enrich(&rich, "en").await.unwrap();
        assert!(enrichment.is_empty());
    }

    #[tokio::test]
    async fn test_payload_enrichment_promoted_to_permanent_cache() {
        let cache = Arc::new(CacheStore::memory_only());
        let engine = engine(Arc::clone(&cache));

        let payload = payload_from_value(json!({
            "name": "Gremi Citadel",
            "description": "short",
            "is_enriched": true,
            "description_enriched": "A 16th-century citadel in Kakheti.",
            "enrichment_sources": ["wikipedia"],
        }));
        let results = vec![SearchResult::new("doc-1", 0.9, sources::DENSE_FOCUSED, payload)];

        let enrichment = engine.enrich(&results, "en").await.unwrap();
        assert_eq!(enrichment.wikipedia_content, "A 16th-century citadel in Kakheti.");

        // promoted: second call hits the permanent tier
        let key = enrichment.cache_key.clone().unwrap();
        assert!(cache
            .has_permanent(namespaces::ENRICHMENT_PERMANENT, &key)
            .await);
    }

    #[tokio::test]
    async fn test_permanent_cache_short_circuits() {
        let cache = Arc::new(CacheStore::memory_only());

        let results = vec![result_with("short", None)];
        let place_key = format!("{:x}", md5::compute("Gremi Citadel"));
        let cached = EnrichmentResult {
            wikipedia_content: "cached content".to_string(),
            enrichment_sources: vec!["wikipedia".to_string()],
            cache_key: Some(place_key.clone()),
            ..Default::default()
        };
        cache
            .set_permanent(namespaces::ENRICHMENT_PERMANENT, &place_key, &cached)
            .await;

        let engine = engine(Arc::clone(&cache));
        let enrichment = engine.enrich(&results, "en").await.unwrap();
        assert_eq!(enrichment.wikipedia_content, "cached content");
    }
}

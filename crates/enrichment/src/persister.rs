//! Enrichment write-back to the vector store
//!
//! Write-backs run on the background worker pool; user requests never
//! wait for them. Writes are whole-payload and last-writer-wins.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use tour_agent_core::document::{
    FIELD_DESCRIPTION_ENRICHED, FIELD_ENRICHED_AT, FIELD_ENRICHED_FIELDS,
    FIELD_ENRICHMENT_SOURCES, FIELD_IMAGES_UNSPLASH, FIELD_IMAGES_WIKIPEDIA, FIELD_IS_ENRICHED,
};
use tour_agent_search::VectorStore;
use tour_agent_worker::{BackgroundTask, TaskQueue};

use crate::web::EnrichmentResult;
use crate::EnrichmentError;

/// Persists enrichment data into vector-store payloads
pub struct EnrichmentPersister {
    store: Arc<VectorStore>,
    queue: Arc<TaskQueue>,
}

impl EnrichmentPersister {
    pub fn new(store: Arc<VectorStore>, queue: Arc<TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Whether a document already carries enrichment
    pub async fn is_enriched(&self, document_id: &str) -> bool {
        match self.store.retrieve(&[document_id.to_string()]).await {
            Ok(docs) => docs
                .first()
                .map(|doc| doc.payload.is_enriched())
                .unwrap_or(false),
            Err(err) => {
                tracing::error!(document_id, %err, "enrichment status check failed");
                false
            }
        }
    }

    /// Queue a write-back; returns immediately
    pub fn persist_async(&self, document_id: String, enrichment: EnrichmentResult) {
        let store = Arc::clone(&self.store);
        let task_name = format!("persist_enrichment_{document_id}");
        let id_for_task = document_id.clone();

        let queued = self.queue.add_task(BackgroundTask::new(task_name, async move {
            persist_sync(&store, &id_for_task, &enrichment)
                .await
                .map_err(Into::into)
        }));

        match queued {
            Ok(()) => tracing::info!(document_id, "queued enrichment write-back"),
            Err(err) => tracing::warn!(document_id, %err, "enrichment write-back not queued"),
        }
    }
}

/// The actual vector-store update, run by a background worker.
///
/// Writes the complete payload. When the document already has an
/// `image_url`, external images are not written to it.
pub async fn persist_sync(
    store: &VectorStore,
    document_id: &str,
    enrichment: &EnrichmentResult,
) -> Result<(), EnrichmentError> {
    tracing::info!(document_id, "updating vector store payload");

    let docs = store
        .retrieve(&[document_id.to_string()])
        .await
        .map_err(|e| EnrichmentError::Persist(e.to_string()))?;

    let Some(current) = docs.into_iter().next() else {
        tracing::warn!(document_id, "document not found in vector store");
        return Err(EnrichmentError::Persist(format!(
            "document {document_id} not found"
        )));
    };

    let (payload, enriched_fields) = merge_enrichment(current.payload, enrichment);

    store
        .set_payload(&[document_id.to_string()], &payload)
        .await
        .map_err(|e| EnrichmentError::Persist(e.to_string()))?;

    tracing::info!(document_id, fields = ?enriched_fields, "vector store updated");
    Ok(())
}

/// Merge enrichment data into a payload. A pre-existing `image_url`
/// keeps external images out of the payload entirely.
pub fn merge_enrichment(
    mut payload: tour_agent_core::Payload,
    enrichment: &EnrichmentResult,
) -> (tour_agent_core::Payload, Vec<&'static str>) {
    let mut enriched_fields: Vec<&'static str> = Vec::new();

    if !enrichment.wikipedia_content.is_empty() {
        payload.insert(
            FIELD_DESCRIPTION_ENRICHED,
            Value::String(enrichment.wikipedia_content.clone()),
        );
        enriched_fields.push("wikipedia_content");
    }

    if !enrichment.wikipedia_images.is_empty() {
        let images: Vec<Value> = enrichment
            .wikipedia_images
            .iter()
            .take(5)
            .map(|url| Value::String(url.clone()))
            .collect();
        payload.insert(FIELD_IMAGES_WIKIPEDIA, Value::Array(images));
        enriched_fields.push("wikipedia_images");
    }

    if !enrichment.unsplash_images.is_empty() {
        if payload.image_url().is_none() {
            let images: Vec<Value> = enrichment
                .unsplash_images
                .iter()
                .take(5)
                .map(|img| {
                    json!({
                        "url": img.url,
                        "photographer": img.photographer,
                        "alt": img.alt,
                    })
                })
                .collect();
            payload.insert(FIELD_IMAGES_UNSPLASH, Value::Array(images));
            enriched_fields.push("unsplash_images");
        } else {
            tracing::info!("skipping external images, corpus image_url present");
        }
    }

    payload.insert(FIELD_ENRICHED_AT, Value::String(Utc::now().to_rfc3339()));
    payload.insert(
        FIELD_ENRICHMENT_SOURCES,
        serde_json::to_value(&enrichment.enrichment_sources).unwrap_or(Value::Null),
    );
    payload.insert(FIELD_IS_ENRICHED, Value::Bool(true));
    payload.insert(
        FIELD_ENRICHED_FIELDS,
        Value::Array(
            enriched_fields
                .iter()
                .map(|f| Value::String(f.to_string()))
                .collect(),
        ),
    );

    (payload, enriched_fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::UnsplashImage;
    use serde_json::json;
    use tour_agent_core::types::payload_from_value;

    fn enrichment_with_images() -> EnrichmentResult {
        EnrichmentResult {
            wikipedia_content: "A fortress above Tbilisi.".to_string(),
            wikipedia_images: vec!["https://wiki/img.jpg".to_string()],
            unsplash_images: vec![UnsplashImage {
                url: "https://unsplash/photo.jpg".to_string(),
                thumbnail: "https://unsplash/thumb.jpg".to_string(),
                photographer: "someone".to_string(),
                alt: Some("fortress".to_string()),
            }],
            serpapi_results: vec![],
            enrichment_sources: vec!["wikipedia".to_string(), "unsplash".to_string()],
            cache_key: None,
        }
    }

    #[test]
    fn test_merge_writes_enrichment_fields() {
        let payload = payload_from_value(json!({ "name": "Narikala" }));
        let (merged, fields) = merge_enrichment(payload, &enrichment_with_images());

        assert!(merged.is_enriched());
        assert_eq!(
            merged.str_field(FIELD_DESCRIPTION_ENRICHED),
            Some("A fortress above Tbilisi.")
        );
        assert!(fields.contains(&"unsplash_images"));
        assert!(merged.get(FIELD_ENRICHED_AT).is_some());
    }

    #[test]
    fn test_existing_image_url_is_never_overwritten() {
        let payload = payload_from_value(json!({
            "name": "Narikala",
            "image_url": "https://cdn/original.jpg",
        }));
        let (merged, fields) = merge_enrichment(payload, &enrichment_with_images());

        assert_eq!(merged.image_url(), Some("https://cdn/original.jpg"));
        assert!(merged.get(FIELD_IMAGES_UNSPLASH).is_none());
        assert!(!fields.contains(&"unsplash_images"));
        // the rest of the enrichment still lands
        assert!(merged.is_enriched());
    }
}

//! Lazy, thread-safe ownership of embedding models
//!
//! The first request for a model name loads it under a per-name mutex
//! so concurrent requests cannot double-load; later requests return the
//! cached instance without locking.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::embeddings::{Embedder, EmbedderConfig, HashingEmbedder, RemoteEmbedder};
use crate::SearchError;

/// Holder statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelHolderStats {
    pub loaded_models: Vec<String>,
    pub total_loads: u64,
    pub cache_hits: u64,
    pub load_times_ms: Vec<(String, u64)>,
}

/// Single-instance holder for embedders keyed by model name
pub struct ModelHolder {
    config: EmbedderConfig,
    models: DashMap<String, Arc<dyn Embedder>>,
    load_locks: DashMap<String, Arc<Mutex<()>>>,
    load_times_ms: DashMap<String, u64>,
    total_loads: AtomicU64,
    cache_hits: AtomicU64,
}

impl ModelHolder {
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            config,
            models: DashMap::new(),
            load_locks: DashMap::new(),
            load_times_ms: DashMap::new(),
            total_loads: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Get a model, loading it on first use
    pub async fn get(&self, model_name: &str) -> Result<Arc<dyn Embedder>, SearchError> {
        if let Some(model) = self.models.get(model_name) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(model.value()));
        }

        let lock = self
            .load_locks
            .entry(model_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // another task may have finished loading while we waited
        if let Some(model) = self.models.get(model_name) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(model.value()));
        }

        tracing::info!(model = model_name, "loading embedding model");
        let started = Instant::now();

        let model: Arc<dyn Embedder> = if model_name == "hashing" {
            Arc::new(HashingEmbedder::new(self.config.clone()))
        } else {
            Arc::new(RemoteEmbedder::new(model_name, self.config.clone())?)
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.models.insert(model_name.to_string(), Arc::clone(&model));
        self.load_times_ms.insert(model_name.to_string(), elapsed_ms);
        self.total_loads.fetch_add(1, Ordering::Relaxed);

        tracing::info!(model = model_name, elapsed_ms, "embedding model loaded");
        Ok(model)
    }

    pub fn stats(&self) -> ModelHolderStats {
        ModelHolderStats {
            loaded_models: self.models.iter().map(|m| m.key().clone()).collect(),
            total_loads: self.total_loads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            load_times_ms: self
                .load_times_ms
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_load_across_concurrent_requests() {
        let holder = Arc::new(ModelHolder::new(EmbedderConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let holder = Arc::clone(&holder);
            handles.push(tokio::spawn(async move {
                holder.get("hashing").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = holder.stats();
        assert_eq!(stats.total_loads, 1);
        assert_eq!(stats.cache_hits, 7);
        assert_eq!(stats.loaded_models, vec!["hashing".to_string()]);
    }

    #[tokio::test]
    async fn test_cached_instance_reused() {
        let holder = ModelHolder::new(EmbedderConfig::default());
        let first = holder.get("hashing").await.unwrap();
        let second = holder.get("hashing").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}

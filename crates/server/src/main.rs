//! Service entry point
//!
//! Wires configuration, caches, the worker pool, retrieval, enrichment
//! and generation together, then serves HTTP until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tour_agent_cache::CacheStore;
use tour_agent_config::{constants::deadlines, load_settings};
use tour_agent_conversation::ConversationStore;
use tour_agent_enrichment::{EnrichmentPersister, WebEnrichmentEngine};
use tour_agent_llm::{ClaudeBackend, ClaudeConfig, ResponseGenerator};
use tour_agent_multilingual::{GroqTranslator, MultilingualManager, TranslatorBackend};
use tour_agent_rag::TourismRag;
use tour_agent_search::{EmbedderConfig, HybridSearchEngine, ModelHolder, VectorStore};
use tour_agent_server::{create_router, init_metrics, AppState};
use tour_agent_worker::TaskQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings(None).context("failed to load settings")?;
    settings.validate().context("invalid configuration")?;

    init_metrics();

    // worker pool starts at process init and stops on shutdown
    let worker_queue = Arc::new(TaskQueue::new(
        settings.worker.workers,
        settings.worker.queue_capacity,
    ));
    worker_queue.start();

    let cache = Arc::new(CacheStore::new(
        None,
        Duration::from_secs(settings.cache.default_ttl_secs),
    ));

    let store = Arc::new(VectorStore::new(&settings.vector_store)?);
    let models = Arc::new(ModelHolder::new(EmbedderConfig {
        dimension: settings.embedding.dimension,
        normalize: true,
        endpoint: settings.embedding.endpoint.clone(),
        timeout: Duration::from_secs(deadlines::CACHE_SECS),
    }));

    let search = Arc::new(HybridSearchEngine::new(
        &settings,
        Arc::clone(&store),
        Arc::clone(&models),
    ));

    let translator: Option<Arc<dyn TranslatorBackend>> = GroqTranslator::new(&settings.translator)
        .map(|backend| Arc::new(backend) as Arc<dyn TranslatorBackend>);
    let multilingual = Arc::new(MultilingualManager::new(
        translator,
        Arc::clone(&cache),
        Duration::from_secs(settings.translator.timeout_secs),
    ));

    let enrichment = settings.enrichment.enabled.then(|| {
        let persister = Arc::new(EnrichmentPersister::new(
            Arc::clone(&store),
            Arc::clone(&worker_queue),
        ));
        Arc::new(WebEnrichmentEngine::new(
            &settings.enrichment,
            Arc::clone(&cache),
            Some(persister),
        ))
    });

    let backend = Arc::new(ClaudeBackend::new(ClaudeConfig::from(&settings.generator))?);
    let generator = Arc::new(ResponseGenerator::new(
        backend,
        Arc::clone(&multilingual),
        Duration::from_secs(settings.generator.timeout_secs),
    ));

    let conversations = Arc::new(ConversationStore::new(
        None,
        settings.conversation.max_history,
        Duration::from_secs(settings.conversation.ttl_secs),
    ));

    let rag = Arc::new(TourismRag::new(
        multilingual,
        search,
        enrichment,
        generator,
        conversations,
        Arc::clone(&cache),
        Arc::clone(&worker_queue),
    ));

    let state = AppState::new(rag);
    let router = create_router(state, &settings.server);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(%address, "tour-agent serving");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    worker_queue.stop();
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

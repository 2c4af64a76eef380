//! HTTP endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use tour_agent_config::ServerConfig;
use tour_agent_core::Language;
use tour_agent_rag::AnswerOptions;

use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/query", post(query))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/conversations/:id", get(conversation_metadata))
        .route("/conversations/:id", delete(clear_conversation))
        .route("/admin/clear-caches", post(clear_caches))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )));

    if let Some(cors) = build_cors_layer(&config.cors_origins, config.cors_enabled) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// CORS from the configured origins; disabled means no CORS headers at
/// all, an empty origin list falls back to a permissive policy.
fn build_cors_layer(origins: &[String], enabled: bool) -> Option<CorsLayer> {
    if !enabled {
        return None;
    }

    if origins.is_empty() {
        tracing::warn!("cors enabled without origins, allowing any origin");
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%origin, %err, "invalid cors origin skipped");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_enrichment")]
    enable_enrichment: bool,
}

fn default_top_k() -> usize {
    5
}

fn default_enrichment() -> bool {
    true
}

/// POST /query — answer one question
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    metrics::counter!("http_requests_total").increment(1);

    let target_language = match &request.language {
        Some(code) => match Language::from_code(code) {
            Some(lang) => Some(lang),
            None => {
                metrics::counter!("http_errors_total").increment(1);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("unsupported language: {code}") })),
                )
                    .into_response();
            }
        },
        None => None,
    };

    let options = AnswerOptions {
        target_language,
        conversation_id: request.conversation_id,
        enable_enrichment: request.enable_enrichment,
        top_k: request.top_k.clamp(1, 20),
    };

    let answer = state.rag.answer(&request.query, options).await;

    Json(json!({
        "response": answer.response,
        "language": answer.language.code(),
        "sources": answer.sources,
        "conversation_id": answer.conversation_id,
        "metadata": answer.metadata,
    }))
    .into_response()
}

/// GET /health — component readiness
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "system": state.rag.system_status(),
    }))
}

/// GET /conversations/:id — metadata without messages
async fn conversation_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rag.conversations().metadata(&id).await {
        Some(metadata) => Json(metadata).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "conversation not found" })),
        )
            .into_response(),
    }
}

/// DELETE /conversations/:id
async fn clear_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.rag.conversations().clear(&id).await;
    Json(json!({ "cleared": id }))
}

/// POST /admin/clear-caches — temporary tiers only
async fn clear_caches(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.rag.clear_temporary_caches().await;
    Json(json!({ "cleared_entries": cleared }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_disabled_adds_no_layer() {
        assert!(build_cors_layer(&["https://example.com".to_string()], false).is_none());
    }

    #[test]
    fn test_cors_enabled_with_origins() {
        let origins = vec![
            "https://example.com".to_string(),
            "not a header value\u{0}".to_string(),
        ];
        assert!(build_cors_layer(&origins, true).is_some());
    }

    #[test]
    fn test_cors_enabled_without_origins_is_permissive() {
        assert!(build_cors_layer(&[], true).is_some());
    }
}

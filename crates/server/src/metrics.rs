//! Prometheus metrics export

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("metrics recorder already installed");
    }

    metrics::describe_counter!("http_requests_total", "HTTP requests served");
    metrics::describe_counter!("http_errors_total", "HTTP error responses");
    metrics::describe_histogram!("rag_duration_seconds", "End-to-end answer latency");
    metrics::describe_counter!("rag_requests_total", "Answered questions");
    metrics::describe_counter!("rag_errors_total", "Failed answer pipelines");
    metrics::describe_histogram!("search_duration_ms", "Hybrid search latency");
    metrics::describe_counter!("search_requests_total", "Hybrid searches run");
}

/// Render the current metrics in the Prometheus text format
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# metrics recorder not installed\n".to_string())
}

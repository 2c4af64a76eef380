//! HTTP surface for the tourism RAG service
//!
//! A thin adapter over the RAG entry point: query endpoint, component
//! readiness, Prometheus metrics, conversation admin.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

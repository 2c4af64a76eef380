//! Shared application state

use std::sync::Arc;

use tour_agent_rag::TourismRag;

/// State shared across request handlers
#[derive(Clone)]
pub struct AppState {
    pub rag: Arc<TourismRag>,
}

impl AppState {
    pub fn new(rag: Arc<TourismRag>) -> Self {
        Self { rag }
    }
}

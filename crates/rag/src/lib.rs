//! Retrieval-augmented answering over the tourism corpus
//!
//! Ties the multilingual dispatch layer, the hybrid retrieval pipeline,
//! enrichment and generation into one entry point.

pub mod context;
pub mod pipeline;

pub use context::{ContextAssembler, QueryRouting};
pub use pipeline::{Answer, AnswerOptions, AnswerSource, TourismRag};

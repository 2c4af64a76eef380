//! Centralized constants shared across crates

/// Cache namespaces
pub mod namespaces {
    pub const TRANSLATION_TEMP: &str = "translation:temp";
    pub const TRANSLATION_PERMANENT: &str = "translation:permanent";
    pub const ENRICHMENT_TEMP: &str = "enrichment:temp";
    pub const ENRICHMENT_PERMANENT: &str = "enrichment:permanent";
    pub const DENSE_EMBEDDINGS: &str = "search:dense:embeddings";
    pub const DENSE_RESULTS: &str = "search:dense:results";
    pub const BM25_RESULTS: &str = "search:bm25:results";
    pub const HYBRID_FINAL: &str = "search:hybrid:final";
    pub const PREFILTER: &str = "search:prefilter";

    /// Namespaces whose entries carry a TTL
    pub const TEMPORARY: [&str; 7] = [
        TRANSLATION_TEMP,
        ENRICHMENT_TEMP,
        DENSE_EMBEDDINGS,
        DENSE_RESULTS,
        BM25_RESULTS,
        HYBRID_FINAL,
        PREFILTER,
    ];

    /// Namespaces whose entries must never expire
    pub const PERMANENT: [&str; 2] = [TRANSLATION_PERMANENT, ENRICHMENT_PERMANENT];
}

/// Default endpoints for external collaborators
pub mod endpoints {
    pub const QDRANT_DEFAULT: &str = "http://localhost:6334";
    pub const ANTHROPIC_DEFAULT: &str = "https://api.anthropic.com";
    pub const GROQ_DEFAULT: &str = "https://api.groq.com/openai/v1";
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";
    pub const WIKIPEDIA_SUMMARY: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
    pub const UNSPLASH_SEARCH: &str = "https://api.unsplash.com/search/photos";
    pub const SERPAPI_SEARCH: &str = "https://serpapi.com/search";
}

/// Retrieval defaults
pub mod search {
    pub const MAX_CANDIDATES: usize = 200;
    pub const DEFAULT_TOP_K: usize = 5;
    pub const RRF_K: f32 = 3.0;
    pub const BM25_K1: f32 = 1.2;
    pub const BM25_B: f32 = 0.75;
    pub const MIN_DENSE_SCORE: f32 = 0.05;
    pub const RESULT_CACHE_MAX: usize = 500;
    pub const RESULT_CACHE_TTL_SECS: u64 = 3600;
    /// Candidate corpora at or below this size skip BM25 for keyword hits
    pub const SMALL_CORPUS_LIMIT: usize = 5;
}

/// Cache defaults
pub mod cache {
    pub const DEFAULT_TTL_SECS: u64 = 86_400;
}

/// Deadlines for remote calls, in seconds
pub mod deadlines {
    pub const CACHE_SECS: u64 = 5;
    pub const TRANSLATE_SECS: u64 = 5;
    pub const ENRICHMENT_SECS: u64 = 10;
    pub const GENERATION_SECS: u64 = 30;
}

/// Conversation defaults
pub mod conversation {
    pub const MAX_HISTORY: usize = 20;
    pub const TTL_SECS: u64 = 86_400;
    pub const CONTEXT_TOKENS: usize = 2000;
    /// Rough chars-per-token budget used by the context window
    pub const CHARS_PER_TOKEN: usize = 4;
}

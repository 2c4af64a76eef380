//! Query analysis and search result types
//!
//! These live for a single request. `SearchResult` is the one concrete
//! result container used downstream of the vector store; payloads are
//! adapted into it at ingress and never carried as a union.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::document::Payload;

/// Result source tags used by the scoring stages
pub mod sources {
    pub const BM25_FOCUSED: &str = "bm25_focused";
    pub const BM25_SIMPLE_MATCH: &str = "bm25_simple_match";
    pub const DENSE_FOCUSED: &str = "dense_focused";
    pub const DENSE_STANDARD: &str = "dense_standard";
}

/// Query intent classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Factual,
    Exploratory,
    Comparative,
    Navigational,
    Filtered,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Factual => "factual",
            QueryIntent::Exploratory => "exploratory",
            QueryIntent::Comparative => "comparative",
            QueryIntent::Navigational => "navigational",
            QueryIntent::Filtered => "filtered",
        }
    }
}

/// Query complexity, assessed from word count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
}

/// Filter strategy hint for the prefilter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    Strict,
    Moderate,
    Loose,
}

impl FilterStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStrategy::Strict => "strict",
            FilterStrategy::Moderate => "moderate",
            FilterStrategy::Loose => "loose",
        }
    }
}

/// A field-condition clause for the vector store.
///
/// Kept store-agnostic here; the prefilter translates clauses into the
/// store's filter grammar (text clauses OR-ed with case variants,
/// boolean clauses AND-ed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterClause {
    /// Boolean metadata flag, e.g. is_religious_site = true
    BoolFlag { field: String, value: bool },
    /// Hard language filter ("RU" / "EN")
    LanguageIs { value: String },
    /// Known-entity match: OR over name and tags with all variants
    EntityMatch { variants: Vec<String> },
}

impl FilterClause {
    pub fn is_text(&self) -> bool {
        matches!(self, FilterClause::EntityMatch { .. })
    }

    /// Field name the clause constrains, for strategy subsetting
    pub fn field(&self) -> &str {
        match self {
            FilterClause::BoolFlag { field, .. } => field,
            FilterClause::LanguageIs { .. } => "language",
            FilterClause::EntityMatch { .. } => "name",
        }
    }
}

/// Extracted entities, grouped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryEntities {
    pub locations: Vec<String>,
    pub categories: Vec<String>,
}

/// Full analysis of one query, produced by the analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    /// Coarse script-level language of the cleaned query ("ru"/"en"/"ka"/"mixed")
    pub language: String,
    pub intent: QueryIntent,
    pub entities: QueryEntities,
    pub complexity: QueryComplexity,
    pub semantic_query: String,
    pub dense_query: String,
    pub keywords: Vec<String>,
    pub filters: Vec<FilterClause>,
    pub filter_strategy: FilterStrategy,
}

/// One ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: String,
    pub score: f32,
    /// Tag of the stage that produced this result
    pub source: String,
    pub payload: Payload,
    /// Usually the document description
    pub content: String,
}

impl SearchResult {
    pub fn new(
        doc_id: impl Into<String>,
        score: f32,
        source: impl Into<String>,
        payload: Payload,
    ) -> Self {
        let content = payload.description().to_string();
        Self {
            doc_id: doc_id.into(),
            score,
            source: source.into(),
            payload,
            content,
        }
    }

    pub fn display_name(&self) -> &str {
        self.payload.name()
    }
}

/// Per-document fusion bookkeeping, attached to fused results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionInfo {
    pub source_scores: HashMap<String, f32>,
    pub rank_info: HashMap<String, usize>,
    pub boost_factor: f32,
    pub sources_used: Vec<String>,
    pub fusion_type: String,
}

impl FusionInfo {
    /// Store onto a result payload under the `fusion_info` key
    pub fn attach(self, payload: &mut Payload) {
        if let Ok(value) = serde_json::to_value(&self) {
            payload.insert("fusion_info", value);
        }
    }

    pub fn from_payload(payload: &Payload) -> Option<FusionInfo> {
        payload
            .get("fusion_info")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Helper: build a payload from a JSON object literal value
pub fn payload_from_value(value: Value) -> Payload {
    match value {
        Value::Object(map) => Payload(map),
        _ => Payload(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_clause_classification() {
        let flag = FilterClause::BoolFlag {
            field: "is_religious_site".to_string(),
            value: true,
        };
        let entity = FilterClause::EntityMatch {
            variants: vec!["narikala".to_string(), "нарикала".to_string()],
        };
        assert!(!flag.is_text());
        assert!(entity.is_text());
        assert_eq!(flag.field(), "is_religious_site");
    }

    #[test]
    fn test_fusion_info_round_trip() {
        let mut payload = payload_from_value(json!({ "name": "Vardzia" }));
        let info = FusionInfo {
            source_scores: HashMap::from([("bm25_focused".to_string(), 1.25)]),
            rank_info: HashMap::from([("bm25_focused".to_string(), 1)]),
            boost_factor: 1.8,
            sources_used: vec!["bm25_focused".to_string()],
            fusion_type: "clean".to_string(),
        };
        info.attach(&mut payload);

        let restored = FusionInfo::from_payload(&payload).unwrap();
        assert_eq!(restored.rank_info.get("bm25_focused"), Some(&1));
        assert!((restored.boost_factor - 1.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_search_result_content_from_description() {
        let payload = payload_from_value(json!({
            "name": "Svetitskhoveli",
            "description": "Cathedral in Mtskheta",
        }));
        let result = SearchResult::new("doc-1", 0.9, sources::DENSE_FOCUSED, payload);
        assert_eq!(result.content, "Cathedral in Mtskheta");
        assert_eq!(result.display_name(), "Svetitskhoveli");
    }
}

//! Corpus documents and vector-store payloads
//!
//! A payload is the JSON map attached to a point in the vector store.
//! Typed accessors cover the fields the retrieval and enrichment stages
//! rely on; everything else stays generic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload field written by the enrichment write-back path
pub const FIELD_DESCRIPTION_ENRICHED: &str = "description_enriched";
pub const FIELD_IMAGES_WIKIPEDIA: &str = "images_wikipedia";
pub const FIELD_IMAGES_UNSPLASH: &str = "images_unsplash";
pub const FIELD_ENRICHED_AT: &str = "enriched_at";
pub const FIELD_ENRICHMENT_SOURCES: &str = "enrichment_sources";
pub const FIELD_ENRICHED_FIELDS: &str = "enriched_fields";
pub const FIELD_IS_ENRICHED: &str = "is_enriched";

/// Vector-store payload: a JSON object keyed by field name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn bool_field(&self, field: &str) -> bool {
        self.0
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn list_field(&self, field: &str) -> Vec<String> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.str_field("name").unwrap_or("Unknown")
    }

    pub fn description(&self) -> &str {
        self.str_field("description").unwrap_or("")
    }

    pub fn location(&self) -> &str {
        self.str_field("location").unwrap_or("")
    }

    pub fn category(&self) -> &str {
        self.str_field("category").unwrap_or("")
    }

    /// Corpus document language tag, "RU" or "EN"
    pub fn language(&self) -> &str {
        self.str_field("language").unwrap_or("RU")
    }

    pub fn tags(&self) -> Vec<String> {
        self.list_field("tags")
    }

    pub fn image_url(&self) -> Option<&str> {
        self.str_field("image_url").filter(|u| !u.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.bool_field("has_processed_image") || self.image_url().is_some()
    }

    pub fn is_enriched(&self) -> bool {
        self.bool_field(FIELD_IS_ENRICHED)
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A corpus document: immutable identity plus mutable payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub payload: Payload,
}

impl Document {
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_from(value: Value) -> Payload {
        match value {
            Value::Object(map) => Payload(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let payload = payload_from(json!({
            "name": "Narikala",
            "description": "Ancient fortress overlooking Tbilisi",
            "language": "EN",
            "tags": ["fortress", "tbilisi"],
            "is_historical_site": true,
        }));

        assert_eq!(payload.name(), "Narikala");
        assert_eq!(payload.language(), "EN");
        assert_eq!(payload.tags(), vec!["fortress", "tbilisi"]);
        assert!(payload.bool_field("is_historical_site"));
        assert!(!payload.is_enriched());
        assert!(!payload.has_image());
    }

    #[test]
    fn test_image_url_empty_string_is_absent() {
        let payload = payload_from(json!({ "image_url": "" }));
        assert!(payload.image_url().is_none());

        let payload = payload_from(json!({ "image_url": "https://cdn.example/narikala.jpg" }));
        assert_eq!(
            payload.image_url(),
            Some("https://cdn.example/narikala.jpg")
        );
        assert!(payload.has_image());
    }
}

//! Vector store client
//!
//! Thin wrapper over Qdrant exposing the four operations the pipeline
//! needs: filtered search, id retrieval, scroll, and payload update.
//! Payloads cross this boundary as JSON maps.

use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, GetPointsBuilder, ListValue, PointId, PointsIdsList,
    ScrollPointsBuilder, SearchPointsBuilder, SetPayloadPointsBuilder, Struct,
};
use qdrant_client::Qdrant;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use tour_agent_config::VectorStoreConfig;
use tour_agent_core::{Document, Payload};

use crate::SearchError;

type QdrantValue = qdrant_client::qdrant::Value;
type QdrantFilter = qdrant_client::qdrant::Filter;

/// One scored point from a vector search
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    collection: String,
}

impl VectorStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, SearchError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("vector store connection using api key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| SearchError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Vector search. `with_payload=false` is used by the prefilter to
    /// fetch candidate ids only.
    pub async fn search(
        &self,
        query_vector: Vec<f32>,
        filter: Option<QdrantFilter>,
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>, SearchError> {
        let mut builder = SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
            .with_payload(with_payload);

        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| SearchError::Search(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point.id.map(point_id_to_string).unwrap_or_default(),
                score: point.score,
                payload: payload_from_qdrant(point.payload),
            })
            .collect())
    }

    /// Fetch documents by id, payload included, vectors excluded
    pub async fn retrieve(&self, ids: &[String]) -> Result<Vec<Document>, SearchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id_from_str(id)).collect();
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, point_ids)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| SearchError::VectorStore(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                Document::new(
                    point.id.map(point_id_to_string).unwrap_or_default(),
                    payload_from_qdrant(point.payload),
                )
            })
            .collect())
    }

    /// Scroll through the collection
    pub async fn scroll(
        &self,
        filter: Option<QdrantFilter>,
        limit: usize,
        offset: Option<String>,
    ) -> Result<(Vec<Document>, Option<String>), SearchError> {
        let mut builder = ScrollPointsBuilder::new(&self.collection)
            .limit(limit as u32)
            .with_payload(true);

        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }
        if let Some(offset) = offset {
            builder = builder.offset(point_id_from_str(&offset));
        }

        let response = self
            .client
            .scroll(builder)
            .await
            .map_err(|e| SearchError::VectorStore(e.to_string()))?;

        let documents = response
            .result
            .into_iter()
            .map(|point| {
                Document::new(
                    point.id.map(point_id_to_string).unwrap_or_default(),
                    payload_from_qdrant(point.payload),
                )
            })
            .collect();

        Ok((documents, response.next_page_offset.map(point_id_to_string)))
    }

    /// Overwrite the listed fields on the given points
    pub async fn set_payload(&self, ids: &[String], payload: &Payload) -> Result<(), SearchError> {
        let qdrant_payload: HashMap<String, QdrantValue> = payload
            .iter()
            .map(|(key, value)| (key.clone(), json_to_qdrant(value.clone())))
            .collect();

        let selector = PointsIdsList {
            ids: ids.iter().map(|id| point_id_from_str(id)).collect(),
        };

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(&self.collection, qdrant_payload)
                    .points_selector(selector),
            )
            .await
            .map_err(|e| SearchError::VectorStore(e.to_string()))?;

        Ok(())
    }
}

/// Numeric strings become numeric point ids, anything else a UUID id
pub fn point_id_from_str(id: &str) -> PointId {
    match id.parse::<u64>() {
        Ok(num) => PointId {
            point_id_options: Some(PointIdOptions::Num(num)),
        },
        Err(_) => PointId {
            point_id_options: Some(PointIdOptions::Uuid(id.to_string())),
        },
    }
}

pub fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

pub fn payload_from_qdrant(payload: HashMap<String, QdrantValue>) -> Payload {
    let mut map = serde_json::Map::new();
    for (key, value) in payload {
        map.insert(key, qdrant_to_json(value));
    }
    Payload(map)
}

pub fn qdrant_to_json(value: QdrantValue) -> JsonValue {
    match value.kind {
        Some(Kind::NullValue(_)) | None => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(b),
        Some(Kind::IntegerValue(i)) => JsonValue::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(s)) => JsonValue::String(s),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(object)) => {
            let mut map = serde_json::Map::new();
            for (key, value) in object.fields {
                map.insert(key, qdrant_to_json(value));
            }
            JsonValue::Object(map)
        }
    }
}

pub fn json_to_qdrant(value: JsonValue) -> QdrantValue {
    let kind = match value {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(b) => Kind::BoolValue(b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Kind::IntegerValue(i)
            } else {
                Kind::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Kind::StringValue(s),
        JsonValue::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant).collect(),
        }),
        JsonValue::Object(map) => Kind::StructValue(Struct {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, json_to_qdrant(value)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_id_round_trip() {
        assert_eq!(point_id_to_string(point_id_from_str("42")), "42");
        assert_eq!(
            point_id_to_string(point_id_from_str("3fa85f64-5717-4562-b3fc-2c963f66afa6")),
            "3fa85f64-5717-4562-b3fc-2c963f66afa6"
        );
    }

    #[test]
    fn test_value_conversion_round_trip() {
        let original = json!({
            "name": "Narikala",
            "is_enriched": true,
            "score": 0.75,
            "visits": 1200,
            "tags": ["fortress", "tbilisi"],
            "nested": { "region": "Tbilisi" },
        });

        let converted = qdrant_to_json(json_to_qdrant(original.clone()));
        assert_eq!(converted, original);
    }
}

// Qdrant-backed ANN service
use async_trait::async_trait;
use qdrant_client::{
    client::{QdrantClient, QdrantClientConfig},
    qdrant::{
        condition::ConditionOneOf, point_id::PointIdOptions, points_selector::PointsSelectorOneOf,
        r#match::MatchValue, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, Condition, CreateCollection, Distance,
        FieldCondition, Filter, ListValue, Match, PointId, PointStruct, PointsSelector,
        SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{RagError, Result};
use crate::types::{SearchFilter, VectorMetadata, VectorSearchResult};
use crate::vector_db::ann::{AnnService, IndexStats};
use crate::vector_db::local::IndexedVector;

pub const DEFAULT_COLLECTION: &str = "concept_rag";

const DOC_ID_KEY: &str = "doc_id";
const CONTENT_KEY: &str = "content";

/// Client settings with every request and connection attempt bounded by `timeout`
fn client_config(url: &str, api_key: Option<String>, timeout: Duration) -> QdrantClientConfig {
    let mut config = QdrantClient::from_url(url);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    config.timeout = timeout;
    config.connect_timeout = timeout;
    config
}

/// Qdrant collection holding one point per document
pub struct QdrantIndex {
    client: QdrantClient,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect and create the collection (cosine distance) if it does not exist
    pub async fn connect(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = client_config(url, api_key, timeout)
            .build()
            .map_err(|e| RagError::VectorService(format!("Failed to create Qdrant client: {}", e)))?;

        let index = Self {
            client,
            collection: collection.into(),
            dimension,
        };
        index.ensure_collection().await?;
        info!(url, collection = %index.collection, "Using Qdrant collection");
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(service_error)?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: self.dimension as u64,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(service_error)?;
            info!(collection = %self.collection, dimension = self.dimension, "Created Qdrant collection");
        }
        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn points_count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(service_error)?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}

/// Qdrant ids must be integers or UUIDs; derive a stable UUID from the doc id
pub fn point_uuid(doc_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes())
}

fn service_error(err: impl std::fmt::Display) -> RagError {
    RagError::VectorService(format!("Qdrant: {}", err))
}

fn payload_for(record: &IndexedVector) -> Result<HashMap<String, QdrantValue>> {
    let mut payload = HashMap::new();
    if let JsonValue::Object(fields) = serde_json::to_value(&record.metadata)? {
        for (key, value) in fields {
            payload.insert(key, json_to_qdrant_value(value));
        }
    }
    payload.insert(DOC_ID_KEY.to_string(), QdrantValue::from(record.doc_id.clone()));
    payload.insert(CONTENT_KEY.to_string(), QdrantValue::from(record.content.clone()));
    Ok(payload)
}

fn match_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

fn filter_for(filter: &SearchFilter) -> Option<Filter> {
    let mut must = Vec::new();
    if let Some(doc_type) = filter.doc_type {
        must.push(match_condition("type", doc_type.as_str()));
    }
    if let Some(theme_id) = &filter.theme_id {
        must.push(match_condition("theme_id", theme_id));
    }
    if let Some(ticker) = &filter.ticker {
        must.push(match_condition("ticker", ticker));
    }
    (!must.is_empty()).then(|| Filter {
        must,
        ..Default::default()
    })
}

#[async_trait]
impl AnnService for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn upsert(&self, records: &[IndexedVector]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let points = records
            .iter()
            .map(|r| {
                Ok(PointStruct::new(
                    point_uuid(&r.doc_id).to_string(),
                    r.values.clone(),
                    payload_for(r)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points_blocking(&self.collection, None, points, None)
            .await
            .map_err(service_error)?;

        debug!(count = records.len(), "Upserted points to Qdrant");
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorSearchResult>> {
        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                filter: filter_for(filter),
                ..Default::default()
            })
            .await
            .map_err(service_error)?;

        let results = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let fallback_id = point_id_to_string(&point.id);
                let mut fields = Map::new();
                for (key, value) in &point.payload {
                    if let Some(json) = qdrant_to_json_value(value) {
                        fields.insert(key.clone(), json);
                    }
                }

                let doc_id = fields
                    .remove(DOC_ID_KEY)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or(fallback_id);
                let content = fields
                    .remove(CONTENT_KEY)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let metadata: VectorMetadata =
                    serde_json::from_value(JsonValue::Object(fields)).ok()?;

                Some(VectorSearchResult {
                    doc_id,
                    score: point.score,
                    metadata,
                    content,
                })
            })
            .collect();

        Ok(results)
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            count: self.points_count().await?,
            dimension: self.dimension,
        })
    }

    async fn delete_all(&self) -> Result<u64> {
        let before = self.points_count().await?;
        self.client
            .delete_points(
                &self.collection,
                None,
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Filter(Filter::default())),
                },
                None,
            )
            .await
            .map_err(service_error)?;
        info!(removed = before, collection = %self.collection, "Cleared Qdrant collection");
        Ok(before)
    }
}

fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else {
                QdrantValue::from(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        JsonValue::Array(items) => QdrantValue {
            kind: Some(Kind::ListValue(ListValue {
                values: items.into_iter().map(json_to_qdrant_value).collect(),
            })),
        },
        _ => QdrantValue::from(""),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        _ => None,
    })
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| match &id.point_id_options {
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            Some(PointIdOptions::Uuid(u)) => Some(u.clone()),
            None => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}

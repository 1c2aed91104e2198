//! Pinecone data-plane client
//!
//! Talks to an index host directly (`https://<index>-<project>.svc.<env>.pinecone.io`)
//! with the `Api-Key` header. Metadata is stored flat; Pinecone rejects null
//! values, so an absent ticker or stock name is written as an empty string.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{RagError, Result};
use crate::types::{SearchFilter, VectorMetadata, VectorSearchResult, THEME_TO_STOCK};
use crate::vector_db::ann::{AnnService, IndexStats};
use crate::vector_db::local::IndexedVector;

/// Vectors per upsert request
pub const UPSERT_BATCH: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PineconeMetadata {
    #[serde(rename = "type")]
    doc_type: String,
    title: String,
    theme_id: String,
    theme_name: String,
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    stock_name: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    content: String,
}

impl PineconeMetadata {
    fn from_record(record: &IndexedVector) -> Self {
        let m = &record.metadata;
        Self {
            doc_type: m.doc_type.clone(),
            title: m.title.clone(),
            theme_id: m.theme_id.clone(),
            theme_name: m.theme_name.clone(),
            ticker: m.ticker.clone().unwrap_or_default(),
            stock_name: m.stock_name.clone().unwrap_or_default(),
            tags: m.tags.clone(),
            content: record.content.clone(),
        }
    }

    fn into_result(self, doc_id: String, score: f32) -> VectorSearchResult {
        let is_stock = self.doc_type == THEME_TO_STOCK;
        VectorSearchResult {
            doc_id,
            score,
            metadata: VectorMetadata {
                doc_type: self.doc_type,
                title: self.title,
                theme_id: self.theme_id,
                theme_name: self.theme_name,
                ticker: is_stock.then_some(self.ticker),
                stock_name: is_stock.then_some(self.stock_name),
                tags: self.tags,
            },
            content: self.content,
        }
    }
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: PineconeMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<PineconeMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: u64,
}

pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    namespace: String,
    timeout: Duration,
}

impl PineconeIndex {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let mut host = host.into().trim_end_matches('/').to_string();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            host = format!("https://{}", host);
        }

        info!(host = %host, "Using Pinecone index");
        Ok(Self {
            client,
            host,
            api_key: api_key.into(),
            namespace: namespace.into(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::from_http(e, self.timeout.as_millis() as u64))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::VectorService(format!(
                "Pinecone {} returned {}: {}",
                path,
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return serde_json::from_str("{}").map_err(RagError::from);
        }
        serde_json::from_str(&text)
            .map_err(|e| RagError::VectorService(format!("Malformed Pinecone response: {}", e)))
    }
}

/// `$eq` conditions for every set filter field
pub(crate) fn filter_json(filter: &SearchFilter) -> Option<Value> {
    let mut conditions = Map::new();
    if let Some(doc_type) = filter.doc_type {
        conditions.insert("type".to_string(), json!({ "$eq": doc_type.as_str() }));
    }
    if let Some(theme_id) = &filter.theme_id {
        conditions.insert("theme_id".to_string(), json!({ "$eq": theme_id }));
    }
    if let Some(ticker) = &filter.ticker {
        conditions.insert("ticker".to_string(), json!({ "$eq": ticker }));
    }
    (!conditions.is_empty()).then_some(Value::Object(conditions))
}

#[async_trait]
impl AnnService for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, records: &[IndexedVector]) -> Result<usize> {
        let mut written = 0;
        for chunk in records.chunks(UPSERT_BATCH) {
            let vectors: Vec<UpsertVector> = chunk
                .iter()
                .map(|r| UpsertVector {
                    id: &r.doc_id,
                    values: &r.values,
                    metadata: PineconeMetadata::from_record(r),
                })
                .collect();

            let body = json!({ "vectors": vectors, "namespace": self.namespace });
            let response: UpsertResponse = self.post("/vectors/upsert", &body).await?;
            written += response.upserted_count;
            debug!(batch = chunk.len(), "Upserted vectors to Pinecone");
        }
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorSearchResult>> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "namespace": self.namespace,
        });
        if let Some(filter) = filter_json(filter) {
            body["filter"] = filter;
        }

        let response: QueryResponse = self.post("/query", &body).await?;
        Ok(response
            .matches
            .into_iter()
            .filter_map(|m| m.metadata.map(|meta| meta.into_result(m.id, m.score)))
            .collect())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let response: StatsResponse = self.post("/describe_index_stats", &json!({})).await?;
        Ok(IndexStats {
            count: response.total_vector_count,
            dimension: response.dimension,
        })
    }

    async fn delete_all(&self) -> Result<u64> {
        let before = self.describe_stats().await?.count;
        let body = json!({ "deleteAll": true, "namespace": self.namespace });
        let _: Value = self.post("/vectors/delete", &body).await?;
        info!(removed = before, "Cleared Pinecone namespace");
        Ok(before)
    }
}

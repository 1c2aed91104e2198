//! Remote HTTP tier
//!
//! Fetches `<base>/manifest.json` and `<base>/docs.jsonl`. A non-2xx status,
//! network failure or timeout is a hard error for the call.

use reqwest::Client;
use std::time::Duration;
use tracing::info;

use crate::errors::{RagError, Result};
use crate::source::parser::parse_documents_jsonl;
use crate::types::{Manifest, RagDocument};

const TIER: &str = "http";

#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: Client,
    base_url: String,
    timeout: Duration,
    batch_size: usize,
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration, batch_size: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            batch_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/manifest.json", self.base_url)
    }

    pub fn documents_url(&self) -> String {
        format!("{}/docs.jsonl", self.base_url)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::from_http(e, self.timeout.as_millis() as u64))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::unavailable(TIER, format!("{} returned {}", url, status)));
        }
        Ok(response)
    }

    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        let url = self.manifest_url();
        let body = self
            .get(&url)
            .await?
            .text()
            .await
            .map_err(|e| RagError::from_http(e, self.timeout.as_millis() as u64))?;

        let manifest: Manifest = serde_json::from_str(&body)?;
        info!(%url, total = manifest.total, "Loaded manifest from URL");
        Ok(manifest)
    }

    pub async fn fetch_documents(&self) -> Result<Vec<RagDocument>> {
        let url = self.documents_url();
        let body = self
            .get(&url)
            .await?
            .text()
            .await
            .map_err(|e| RagError::from_http(e, self.timeout.as_millis() as u64))?;

        let documents = parse_documents_jsonl(&body, self.batch_size).await;
        info!(%url, bytes = body.len(), count = documents.len(), "Loaded documents from URL");
        Ok(documents)
    }
}

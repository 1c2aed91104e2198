//! Vector store
//!
//! Embeds documents and serves top-K similarity search. The in-process
//! index is always populated; when an external ANN service is configured it
//! is written to as well and queried first, falling back to the local index
//! if the call fails.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::types::{RagDocument, SearchOptions, VectorMetadata, VectorSearchResult};
use crate::vector_db::ann::{AnnService, IndexStats};
use crate::vector_db::local::{IndexedVector, LocalVectorIndex};

/// Concurrent embedding requests while indexing
pub const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct VectorStats {
    /// `local`, or the external backend name
    pub backend: String,
    pub embedder: Option<String>,
    pub local_count: usize,
    pub dimension: Option<usize>,
    /// Present when the external service answered
    pub external: Option<IndexStats>,
}

pub struct VectorStore {
    embedder: Option<Arc<dyn Embedder>>,
    ann: Option<Arc<dyn AnnService>>,
    local: RwLock<LocalVectorIndex>,
}

impl VectorStore {
    /// Local-only store
    pub fn local(embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            embedder,
            ann: None,
            local: RwLock::new(LocalVectorIndex::new()),
        }
    }

    /// Store backed by an external ANN service
    pub fn external(embedder: Arc<dyn Embedder>, ann: Arc<dyn AnnService>) -> Self {
        Self {
            embedder: Some(embedder),
            ann: Some(ann),
            local: RwLock::new(LocalVectorIndex::new()),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.ann.as_ref().map(|a| a.name()).unwrap_or("local")
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// True when the local index holds no vectors
    pub async fn is_empty(&self) -> bool {
        self.local.read().await.is_empty()
    }

    /// Embed and index every document; returns the number indexed.
    /// A document whose embedding fails is stored with a zero vector.
    pub async fn index_documents(&self, documents: &[RagDocument]) -> Result<usize> {
        let Some(embedder) = self.embedder.clone() else {
            info!("No embedding provider configured, vector index left empty");
            return Ok(0);
        };
        let dimension = embedder.dimension();

        let records: Vec<IndexedVector> = stream::iter(documents)
            .map(|doc| {
                let embedder = embedder.clone();
                async move {
                    let values = match embedder.embed(&doc.embedding_text()).await {
                        Ok(values) => values,
                        Err(e) => {
                            warn!(doc_id = %doc.doc_id, error = %e, "Embedding failed, storing zero vector");
                            vec![0.0; dimension]
                        }
                    };
                    IndexedVector {
                        doc_id: doc.doc_id.clone(),
                        values,
                        metadata: VectorMetadata::from(doc),
                        content: doc.text.clone(),
                    }
                }
            })
            .buffered(EMBED_CONCURRENCY)
            .collect()
            .await;

        {
            let mut local = self.local.write().await;
            for record in &records {
                local.upsert(record.clone());
            }
        }

        if let Some(ann) = &self.ann {
            match ann.upsert(&records).await {
                Ok(written) => info!(backend = ann.name(), written, "Upserted vectors"),
                Err(e) => warn!(
                    backend = ann.name(),
                    error = %e,
                    "External upsert failed, serving from local index"
                ),
            }
        }

        info!(count = records.len(), "Indexed documents");
        Ok(records.len())
    }

    /// Top-K similarity search; degrades to an empty result when the query
    /// cannot be embedded
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<VectorSearchResult>> {
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        if options.top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = match embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, returning no vector results");
                return Ok(Vec::new());
            }
        };

        if let Some(ann) = &self.ann {
            match ann.query(&vector, options.top_k, &options.filter).await {
                Ok(results) => {
                    debug!(backend = ann.name(), hits = results.len(), "External vector query");
                    return Ok(results);
                }
                Err(e) => warn!(
                    backend = ann.name(),
                    error = %e,
                    "External query failed, falling back to local index"
                ),
            }
        }

        let results = self
            .local
            .read()
            .await
            .query(&vector, options.top_k, &options.filter);
        debug!(hits = results.len(), "Local vector query");
        Ok(results)
    }

    pub async fn stats(&self) -> VectorStats {
        let (local_count, dimension) = {
            let local = self.local.read().await;
            (local.len(), local.dimension())
        };

        let external = match &self.ann {
            Some(ann) => match ann.describe_stats().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    warn!(backend = ann.name(), error = %e, "Could not read external index stats");
                    None
                }
            },
            None => None,
        };

        VectorStats {
            backend: self.backend_name().to_string(),
            embedder: self.embedder.as_ref().map(|e| e.name().to_string()),
            local_count,
            dimension: dimension.or_else(|| self.embedder.as_ref().map(|e| e.dimension())),
            external,
        }
    }

    /// Drop all vectors; returns how many were removed from the local index
    pub async fn clear(&self) -> usize {
        let removed = self.local.write().await.clear();
        if let Some(ann) = &self.ann {
            if let Err(e) = ann.delete_all().await {
                warn!(backend = ann.name(), error = %e, "External delete failed");
            }
        }
        info!(removed, "Cleared vector store");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RagError;
    use crate::types::{DocumentType, SearchFilter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Character-bucket embedder: deterministic, no I/O
    struct BucketEmbedder;

    #[async_trait]
    impl Embedder for BucketEmbedder {
        fn dimension(&self) -> usize {
            8
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("FAIL") {
                return Err(RagError::Embedding("forced".to_string()));
            }
            let mut v = vec![0.0; 8];
            for c in text.chars() {
                v[(c as usize) % 8] += 1.0;
            }
            Ok(v)
        }

        fn name(&self) -> &str {
            "bucket"
        }
    }

    /// ANN service whose every call fails
    struct BrokenAnn {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnnService for BrokenAnn {
        fn name(&self) -> &str {
            "broken"
        }

        async fn upsert(&self, _records: &[IndexedVector]) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RagError::VectorService("down".to_string()))
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _filter: &SearchFilter,
        ) -> Result<Vec<VectorSearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RagError::VectorService("down".to_string()))
        }

        async fn describe_stats(&self) -> Result<IndexStats> {
            Err(RagError::VectorService("down".to_string()))
        }

        async fn delete_all(&self) -> Result<u64> {
            Err(RagError::VectorService("down".to_string()))
        }
    }

    fn docs() -> Vec<RagDocument> {
        vec![
            RagDocument::theme_overview("ov.a", "theme.a", "aaaa", "aaaa aaaa"),
            RagDocument::theme_to_stock("ts.b", "theme.a", "aaaa", "1", "bbbb", "bbbb bbbb"),
            RagDocument::theme_to_stock("ts.fail", "theme.a", "aaaa", "2", "cccc", "FAIL"),
        ]
    }

    #[tokio::test]
    async fn test_index_and_search_locally() {
        let store = VectorStore::local(Some(Arc::new(BucketEmbedder)));
        assert_eq!(store.index_documents(&docs()).await.unwrap(), 3);

        let results = store.search("bbbb", &SearchOptions::top_k(1)).await.unwrap();
        assert_eq!(results[0].doc_id, "ts.b");

        let overview_only = SearchOptions::top_k(5)
            .with_filter(SearchFilter::by_type(DocumentType::ThemeOverview));
        let results = store.search("bbbb", &overview_only).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "ov.a");
    }

    #[tokio::test]
    async fn test_embedding_failure_stores_zero_vector() {
        let store = VectorStore::local(Some(Arc::new(BucketEmbedder)));
        store.index_documents(&docs()).await.unwrap();

        let results = store.search("cccc", &SearchOptions::top_k(3)).await.unwrap();
        let failed = results.iter().find(|r| r.doc_id == "ts.fail").unwrap();
        assert_eq!(failed.score, 0.0);
    }

    #[tokio::test]
    async fn test_reindex_is_idempotent() {
        let store = VectorStore::local(Some(Arc::new(BucketEmbedder)));
        store.index_documents(&docs()).await.unwrap();
        store.index_documents(&docs()).await.unwrap();
        assert_eq!(store.stats().await.local_count, 3);
    }

    #[tokio::test]
    async fn test_failed_query_embedding_is_empty() {
        let store = VectorStore::local(Some(Arc::new(BucketEmbedder)));
        store.index_documents(&docs()).await.unwrap();
        assert!(store.search("FAIL", &SearchOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_external_failure_falls_back_to_local() {
        let ann = Arc::new(BrokenAnn {
            calls: AtomicUsize::new(0),
        });
        let store = VectorStore::external(Arc::new(BucketEmbedder), ann.clone());
        assert_eq!(store.index_documents(&docs()).await.unwrap(), 3);

        let results = store.search("aaaa", &SearchOptions::top_k(1)).await.unwrap();
        assert_eq!(results[0].doc_id, "ov.a");
        assert_eq!(ann.calls.load(Ordering::SeqCst), 2);

        let stats = store.stats().await;
        assert_eq!(stats.backend, "broken");
        assert!(stats.external.is_none());
        assert_eq!(stats.local_count, 3);
    }

    #[tokio::test]
    async fn test_without_embedder() {
        let store = VectorStore::local(None);
        assert_eq!(store.index_documents(&docs()).await.unwrap(), 0);
        assert!(store.search("aaaa", &SearchOptions::default()).await.unwrap().is_empty());
        assert_eq!(store.clear().await, 0);
    }
}

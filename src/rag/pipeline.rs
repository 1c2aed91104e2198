// End-to-end RAG pipeline: load, validate, index, search, build context
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::CacheStats;
use crate::errors::Result;
use crate::rag::context::{AssembledContext, ContextBuilder, ContextConfig};
use crate::rag::retrieval::{RetrievalConfig, RetrievalEngine};
use crate::source::{DeploymentMode, DocumentResolver};
use crate::types::{DocumentSet, Manifest, RagDocument, SearchOptions, VectorSearchResult};
use crate::validation::{DetailedReport, IntegrityValidator, ValidationReport, ValidatorConfig};
use crate::vector_db::{VectorStats, VectorStore};

/// RAG pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Default search options when the caller passes none
    pub search: SearchOptions,
    /// Keyword / vector blending
    pub retrieval: RetrievalConfig,
    /// Context assembly configuration
    pub context: ContextConfig,
    /// Which integrity checks run
    pub validator: ValidatorConfig,
    /// Embed the corpus on the first search when the vector index is empty
    pub auto_index: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            validator: ValidatorConfig::default(),
            auto_index: true,
        }
    }
}

/// Query answer: ranked hits plus the context built from them
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Original query
    pub query: String,
    /// Ranked search results
    pub results: Vec<VectorSearchResult>,
    /// Context assembled from the matching documents
    pub context: AssembledContext,
}

/// The single entry point over the document subsystem
pub struct RagPipeline {
    resolver: DocumentResolver,
    validator: IntegrityValidator,
    store: Arc<VectorStore>,
    retrieval: RetrievalEngine,
    context_builder: ContextBuilder,
    config: PipelineConfig,
}

impl RagPipeline {
    /// Create new pipeline with default configuration
    pub fn new(resolver: DocumentResolver, store: Arc<VectorStore>) -> Self {
        Self::with_config(resolver, store, PipelineConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(resolver: DocumentResolver, store: Arc<VectorStore>, config: PipelineConfig) -> Self {
        Self {
            validator: IntegrityValidator::with_config(config.validator.clone()),
            retrieval: RetrievalEngine::with_config(store.clone(), config.retrieval.clone()),
            context_builder: ContextBuilder::with_config(config.context.clone()),
            resolver,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> DeploymentMode {
        self.resolver.mode()
    }

    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub async fn load_manifest(&self) -> Result<Manifest> {
        self.resolver.load_manifest().await
    }

    pub async fn load_documents(&self) -> Result<DocumentSet> {
        self.resolver.load_documents().await
    }

    /// Documents, or `fallback` when every tier fails
    pub async fn load_documents_or(&self, fallback: DocumentSet) -> DocumentSet {
        match self.resolver.load_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, fallback = fallback.len(), "Using caller-supplied documents");
                fallback
            }
        }
    }

    /// Manifest and documents, loaded concurrently
    pub async fn load_corpus(&self) -> Result<(Manifest, DocumentSet)> {
        self.resolver.load_corpus().await
    }

    pub fn validate(&self, manifest: &Manifest, documents: &[RagDocument]) -> ValidationReport {
        self.validator.validate(manifest, documents)
    }

    /// Load both artifacts, then validate them against each other
    pub async fn validate_loaded(&self) -> Result<ValidationReport> {
        let (manifest, documents) = self.load_corpus().await?;
        let report = self.validate(&manifest, &documents);
        if report.is_valid {
            info!(documents = documents.len(), "Corpus passed integrity checks");
        } else {
            warn!(errors = report.errors.len(), "Corpus failed integrity checks");
        }
        Ok(report)
    }

    pub fn detailed_report(&self, manifest: &Manifest, documents: &[RagDocument]) -> DetailedReport {
        self.validator.detailed_report(manifest, documents)
    }

    /// Load the documents and embed them into the vector store
    pub async fn index_documents(&self) -> Result<usize> {
        let documents = self.load_documents().await?;
        self.store.index_documents(&documents).await
    }

    /// Index `documents` if an embedder is configured and nothing is indexed yet
    async fn ensure_indexed(&self, documents: &[RagDocument]) -> Result<()> {
        if !self.config.auto_index || !self.store.has_embedder() || !self.store.is_empty().await {
            return Ok(());
        }
        let indexed = self.store.index_documents(documents).await?;
        debug!(indexed, "Vector index built on first search");
        Ok(())
    }

    /// Ranked results over the loaded corpus
    pub async fn search(&self, query: &str, options: Option<&SearchOptions>) -> Result<Vec<VectorSearchResult>> {
        let options = options.unwrap_or(&self.config.search);
        let documents = self.load_documents().await?;
        self.ensure_indexed(&documents).await?;
        let results = self.retrieval.search(&documents, query, options).await?;
        debug!(query, results = results.len(), "Pipeline search");
        Ok(results)
    }

    /// Context text bounded by `max_length` characters
    pub fn build_context(&self, documents: &[RagDocument], query: &str, max_length: usize) -> AssembledContext {
        self.context_builder.build(documents, query, max_length)
    }

    /// Search, then build context from the hits in rank order
    pub async fn context_for_query(
        &self,
        query: &str,
        options: Option<&SearchOptions>,
        max_length: Option<usize>,
    ) -> Result<QueryResult> {
        let options = options.unwrap_or(&self.config.search);
        let documents = self.load_documents().await?;
        self.ensure_indexed(&documents).await?;
        let results = self.retrieval.search(&documents, query, options).await?;

        let hits: Vec<RagDocument> = results
            .iter()
            .filter_map(|hit| documents.iter().find(|doc| doc.doc_id == hit.doc_id))
            .cloned()
            .collect();

        let max_length = max_length.unwrap_or(self.context_builder.config().max_length);
        let context = self.context_builder.build(&hits, query, max_length);

        Ok(QueryResult {
            query: query.to_string(),
            results,
            context,
        })
    }

    pub fn clear_cache(&self) {
        self.resolver.cache().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache().stats()
    }

    pub async fn vector_stats(&self) -> VectorStats {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CorpusCache;
    use crate::source::{FilesystemSource, RemoteSource};
    use std::time::Duration;
    use tempfile::TempDir;

    fn pipeline(mode: DeploymentMode, base_dir: &std::path::Path) -> RagPipeline {
        let remote = RemoteSource::new("http://127.0.0.1:9/rag", Duration::from_secs(2), 10).unwrap();
        let resolver = DocumentResolver::new(
            mode,
            FilesystemSource::new(base_dir, 10),
            remote,
            Arc::new(CorpusCache::default()),
        );
        RagPipeline::new(resolver, Arc::new(VectorStore::local(None)))
    }

    #[tokio::test]
    async fn test_embedded_corpus_is_valid() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Embedded, temp.path());
        let report = pipeline.validate_loaded().await.unwrap();
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[tokio::test]
    async fn test_search_finds_stock_relation() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Embedded, temp.path());
        let results = pipeline
            .search("台積電", Some(&SearchOptions::top_k(1)))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].doc_id.contains("台積電"));
    }

    #[tokio::test]
    async fn test_context_for_query_respects_budget() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Embedded, temp.path());
        let answer = pipeline.context_for_query("台積電", None, Some(200)).await.unwrap();
        assert!(!answer.results.is_empty());
        assert!(answer.context.text.chars().count() <= 200);
        assert!(answer.context.text.contains("台積電"));
    }

    #[tokio::test]
    async fn test_load_documents_or_uses_fallback() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Local, temp.path());
        let fallback: DocumentSet = Arc::new(vec![RagDocument::theme_overview("ov", "t", "主題", "說明")]);
        let documents = pipeline.load_documents_or(fallback.clone()).await;
        assert_eq!(documents, fallback);
        assert!(pipeline.load_documents().await.is_err());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Embedded, temp.path());
        pipeline.load_corpus().await.unwrap();
        assert!(pipeline.cache_stats().documents.cached);

        pipeline.clear_cache();
        let stats = pipeline.cache_stats();
        assert!(!stats.manifest.cached && !stats.documents.cached);
    }

    #[tokio::test]
    async fn test_index_without_embedder() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(DeploymentMode::Embedded, temp.path());
        assert_eq!(pipeline.index_documents().await.unwrap(), 0);
        let stats = pipeline.vector_stats().await;
        assert_eq!(stats.backend, "local");
        assert_eq!(stats.local_count, 0);
    }
}

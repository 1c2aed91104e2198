// Retrieval engine: keyword relevance blended with vector similarity
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::rag::reranking::RelevanceScorer;
use crate::types::{RagDocument, SearchOptions, VectorSearchResult};
use crate::vector_db::VectorStore;

/// Retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Multiplier applied to a non-negative cosine similarity before it is
    /// added to the keyword relevance
    pub vector_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { vector_weight: 5.0 }
    }
}

/// Ranked search over a loaded document set
pub struct RetrievalEngine {
    store: Arc<VectorStore>,
    scorer: RelevanceScorer,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self::with_config(store, RetrievalConfig::default())
    }

    pub fn with_config(store: Arc<VectorStore>, config: RetrievalConfig) -> Self {
        Self {
            store,
            scorer: RelevanceScorer::new(),
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Keyword candidates scored by relevance plus weighted similarity.
    /// With no keyword candidate the vector hits are returned as they are.
    pub async fn search(
        &self,
        documents: &[RagDocument],
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<VectorSearchResult>> {
        if options.top_k == 0 {
            return Ok(Vec::new());
        }

        let filtered: Vec<RagDocument> = documents
            .iter()
            .filter(|doc| options.filter.matches(doc))
            .cloned()
            .collect();

        let vector_options = SearchOptions {
            top_k: filtered.len().max(options.top_k),
            filter: options.filter.clone(),
        };
        let vector_hits = self.store.search(query, &vector_options).await?;

        let ranked = self.scorer.rank(&filtered, query);
        if ranked.is_empty() {
            debug!(query, hits = vector_hits.len(), "No keyword candidates, using vector results");
            let mut hits = vector_hits;
            hits.truncate(options.top_k);
            return Ok(hits);
        }

        let similarity: HashMap<&str, f32> = vector_hits
            .iter()
            .map(|hit| (hit.doc_id.as_str(), hit.score))
            .collect();

        let mut results: Vec<VectorSearchResult> = ranked
            .iter()
            .map(|scored| {
                let sim = similarity
                    .get(scored.document.doc_id.as_str())
                    .copied()
                    .unwrap_or(0.0);
                let combined = scored.relevance + self.config.vector_weight * sim.max(0.0);
                VectorSearchResult::from_document(scored.document, combined)
            })
            .collect();

        // Stable: equal scores keep keyword rank, which keeps corpus order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(options.top_k);

        debug!(query, candidates = ranked.len(), returned = results.len(), "Search complete");
        Ok(results)
    }

    /// Keyword-only ranking, no embedding calls
    pub fn keyword_search(
        &self,
        documents: &[RagDocument],
        query: &str,
        options: &SearchOptions,
    ) -> Vec<VectorSearchResult> {
        let filtered: Vec<RagDocument> = documents
            .iter()
            .filter(|doc| options.filter.matches(doc))
            .cloned()
            .collect();

        self.scorer
            .rank(&filtered, query)
            .into_iter()
            .take(options.top_k)
            .map(|scored| VectorSearchResult::from_document(scored.document, scored.relevance))
            .collect()
    }
}

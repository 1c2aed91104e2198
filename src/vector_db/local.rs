// In-process brute-force cosine index keyed by doc_id
use std::collections::HashMap;

use crate::types::{SearchFilter, VectorMetadata, VectorSearchResult};
use crate::vector_db::similarity::cosine_similarity;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    pub doc_id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
    pub content: String,
}

/// Vectors in insertion order; upserting an existing id replaces it in place
#[derive(Debug, Default)]
pub struct LocalVectorIndex {
    entries: Vec<IndexedVector>,
    positions: HashMap<String, usize>,
}

impl LocalVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: IndexedVector) {
        match self.positions.get(&record.doc_id) {
            Some(&pos) => self.entries[pos] = record,
            None => {
                self.positions.insert(record.doc_id.clone(), self.entries.len());
                self.entries.push(record);
            }
        }
    }

    /// Top-K by cosine similarity; ties keep insertion order
    pub fn query(&self, vector: &[f32], top_k: usize, filter: &SearchFilter) -> Vec<VectorSearchResult> {
        let mut scored: Vec<(f32, &IndexedVector)> = self
            .entries
            .iter()
            .filter(|e| filter.matches_metadata(&e.metadata))
            .map(|e| (cosine_similarity(vector, &e.values), e))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, e)| VectorSearchResult {
                doc_id: e.doc_id.clone(),
                score,
                metadata: e.metadata.clone(),
                content: e.content.clone(),
            })
            .collect()
    }

    pub fn get(&self, doc_id: &str) -> Option<&IndexedVector> {
        self.positions.get(doc_id).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension of the first stored vector
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.values.len())
    }

    /// Remove everything, returning how many vectors were dropped
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.positions.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentType, RagDocument};

    fn record(doc: &RagDocument, values: Vec<f32>) -> IndexedVector {
        IndexedVector {
            doc_id: doc.doc_id.clone(),
            values,
            metadata: VectorMetadata::from(doc),
            content: doc.text.clone(),
        }
    }

    fn sample_index() -> LocalVectorIndex {
        let ov = RagDocument::theme_overview("ov.ai", "theme.ai", "AI 伺服器", "伺服器");
        let a = RagDocument::theme_to_stock("ts.a", "theme.ai", "AI 伺服器", "2330", "台積電", "晶圓");
        let b = RagDocument::theme_to_stock("ts.b", "theme.ai", "AI 伺服器", "2382", "廣達", "組裝");

        let mut index = LocalVectorIndex::new();
        index.upsert(record(&ov, vec![0.0, 1.0]));
        index.upsert(record(&a, vec![1.0, 0.0]));
        index.upsert(record(&b, vec![1.0, 0.0]));
        index
    }

    #[test]
    fn test_query_orders_by_similarity_with_stable_ties() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0], 3, &SearchFilter::default());
        let ids: Vec<_> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["ts.a", "ts.b", "ov.ai"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut index = sample_index();
        let doc = RagDocument::theme_to_stock("ts.a", "theme.ai", "AI 伺服器", "2330", "台積電", "晶圓");
        index.upsert(record(&doc, vec![0.0, 1.0]));

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("ts.a").map(|e| e.values.clone()), Some(vec![0.0, 1.0]));

        // Replaced entry keeps its original slot for tie-breaking
        let results = index.query(&[0.0, 1.0], 2, &SearchFilter::default());
        assert_eq!(results[0].doc_id, "ov.ai");
        assert_eq!(results[1].doc_id, "ts.a");
    }

    #[test]
    fn test_filter_and_top_k() {
        let index = sample_index();
        let filter = SearchFilter::by_type(DocumentType::ThemeOverview);
        let results = index.query(&[1.0, 0.0], 10, &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "ov.ai");

        assert_eq!(index.query(&[1.0, 0.0], 1, &SearchFilter::default()).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut index = sample_index();
        assert_eq!(index.dimension(), Some(2));
        assert_eq!(index.clear(), 3);
        assert!(index.is_empty());
        assert!(index.get("ts.a").is_none());
    }
}

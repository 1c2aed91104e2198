// External approximate-nearest-neighbour service interface
use async_trait::async_trait;
use serde::Serialize;

use crate::errors::Result;
use crate::types::{SearchFilter, VectorSearchResult};
use crate::vector_db::local::IndexedVector;

/// Index size as reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub count: u64,
    pub dimension: usize,
}

#[async_trait]
pub trait AnnService: Send + Sync {
    /// Backend label for logs and stats
    fn name(&self) -> &str;

    /// Insert or replace by `doc_id`; returns the number written
    async fn upsert(&self, records: &[IndexedVector]) -> Result<usize>;

    /// Top-K matches with the same filter semantics as the local index
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorSearchResult>>;

    async fn describe_stats(&self) -> Result<IndexStats>;

    /// Remove every vector; returns how many were removed
    async fn delete_all(&self) -> Result<u64>;
}

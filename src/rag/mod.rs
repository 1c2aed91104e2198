// Query and ranking over the theme/stock corpus
//
// Components:
// - Retrieval Engine: keyword candidates blended with vector similarity
// - Re-ranking: deterministic keyword relevance scoring
// - Context Builder: bounded, sectioned context for prompts
// - Query: structured lookups (themes, stocks, stats, summary)
// - Pipeline: the facade owning resolver, cache, validator and vector store

pub mod context;
pub mod pipeline;
pub mod query;
pub mod reranking;
pub mod retrieval;

// Re-export key types
pub use context::{AssembledContext, ContextBuilder, ContextConfig, NO_DOCUMENTS_NOTICE};
pub use pipeline::{PipelineConfig, QueryResult, RagPipeline};
pub use query::{CorpusQuery, CorpusStats, CorpusSummary};
pub use reranking::{RelevanceScorer, ScoringWeights};
pub use retrieval::{RetrievalConfig, RetrievalEngine};

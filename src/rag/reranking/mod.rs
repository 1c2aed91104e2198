// Keyword relevance scoring
pub mod scorer;

pub use scorer::{query_tokens, RelevanceScorer, ScoredDocument, ScoringWeights};

// Retrieval engine module
pub mod engine;

pub use engine::{RetrievalConfig, RetrievalEngine};

//! Vector storage and similarity search
//!
//! Components:
//! - Local index: brute-force cosine over an in-process map
//! - ANN services: Pinecone (REST) and Qdrant (gRPC client)
//! - VectorStore: embeds, indexes and queries with local fallback

pub mod ann;
pub mod local;
pub mod pinecone;
pub mod qdrant;
pub mod similarity;
pub mod store;

pub use ann::{AnnService, IndexStats};
pub use local::{IndexedVector, LocalVectorIndex};
pub use pinecone::PineconeIndex;
pub use qdrant::QdrantIndex;
pub use similarity::cosine_similarity;
pub use store::{VectorStats, VectorStore};

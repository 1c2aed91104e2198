//! concept-rag - theme and stock document retrieval
//!
//! Loads a corpus of `theme_overview` and `theme_to_stock` documents,
//! checks it against its manifest, and serves ranked search results and
//! bounded prompt context over it.
//!
//! # Architecture
//!
//! - **source**: deployment-aware resolver (embedded, filesystem, HTTP)
//! - **validation**: manifest/document integrity checks
//! - **cache**: TTL cache shared by the resolver
//! - **embedding** + **vector_db**: embeddings, local and external ANN indexes
//! - **rag**: scoring, retrieval, context assembly and the pipeline facade

pub mod errors;
pub mod types;

pub mod cache;
pub mod source;
pub mod validation;

pub mod embedding;
pub mod vector_db;

pub mod rag;

pub mod cli;
pub mod config;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use rag::{QueryResult, RagPipeline};
pub use types::{DocumentSet, Manifest, RagDocument, SearchOptions, VectorSearchResult};

//! Core data model: documents, manifest and search results

pub mod document;
pub mod manifest;
pub mod search;

pub use document::{
    DocumentKind, DocumentRecord, DocumentSet, DocumentType, RagDocument, THEME_OVERVIEW,
    THEME_TO_STOCK,
};
pub use manifest::{default_fields, Manifest, DEFAULT_FIELDS};
pub use search::{SearchFilter, SearchOptions, VectorMetadata, VectorSearchResult};

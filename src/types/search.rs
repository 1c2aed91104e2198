// Search request and result types shared by the vector store and retrieval engine
use serde::{Deserialize, Serialize};

use crate::types::document::{DocumentType, RagDocument};

/// Optional restriction applied before ranking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
}

impl SearchFilter {
    pub fn by_type(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
            ..Default::default()
        }
    }

    pub fn by_theme(theme_id: impl Into<String>) -> Self {
        Self {
            theme_id: Some(theme_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.doc_type.is_none() && self.theme_id.is_none() && self.ticker.is_none()
    }

    pub fn matches(&self, doc: &RagDocument) -> bool {
        if let Some(doc_type) = self.doc_type {
            if doc.doc_type() != Some(doc_type) {
                return false;
            }
        }
        if let Some(theme_id) = &self.theme_id {
            if &doc.theme_id != theme_id {
                return false;
            }
        }
        if let Some(ticker) = &self.ticker {
            if doc.ticker() != Some(ticker.as_str()) {
                return false;
            }
        }
        true
    }

    /// Same semantics as [`matches`](Self::matches), applied to stored metadata
    pub fn matches_metadata(&self, metadata: &VectorMetadata) -> bool {
        if let Some(doc_type) = self.doc_type {
            if metadata.doc_type != doc_type.as_str() {
                return false;
            }
        }
        if let Some(theme_id) = &self.theme_id {
            if &metadata.theme_id != theme_id {
                return false;
            }
        }
        if let Some(ticker) = &self.ticker {
            if metadata.ticker.as_deref() != Some(ticker.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results to return
    pub top_k: usize,
    #[serde(default)]
    pub filter: SearchFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            filter: SearchFilter::default(),
        }
    }
}

impl SearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub theme_id: String,
    pub theme_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&RagDocument> for VectorMetadata {
    fn from(doc: &RagDocument) -> Self {
        Self {
            doc_type: doc.kind.type_name().to_string(),
            title: doc.title.clone(),
            theme_id: doc.theme_id.clone(),
            theme_name: doc.theme_name.clone(),
            ticker: doc.ticker().map(str::to_string),
            stock_name: doc.stock_name().map(str::to_string),
            tags: doc.tags.clone(),
        }
    }
}

/// Ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub doc_id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
    pub content: String,
}

impl VectorSearchResult {
    pub fn from_document(doc: &RagDocument, score: f32) -> Self {
        Self {
            doc_id: doc.doc_id.clone(),
            score,
            metadata: VectorMetadata::from(doc),
            content: doc.text.clone(),
        }
    }
}

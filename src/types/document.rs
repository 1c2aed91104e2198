//! Corpus documents
//!
//! A document is either a theme overview or a theme-to-stock link. The JSONL
//! wire format is one flat object per line with a `type` discriminator; it is
//! read into [`DocumentRecord`] and converted into the typed [`RagDocument`].

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Wire name of the theme overview variant
pub const THEME_OVERVIEW: &str = "theme_overview";

/// Wire name of the theme-to-stock variant
pub const THEME_TO_STOCK: &str = "theme_to_stock";

/// Immutable, shareable document set
pub type DocumentSet = Arc<Vec<RagDocument>>;

/// Document variant discriminator (no payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ThemeOverview,
    ThemeToStock,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThemeOverview => THEME_OVERVIEW,
            Self::ThemeToStock => THEME_TO_STOCK,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            THEME_OVERVIEW => Some(Self::ThemeOverview),
            THEME_TO_STOCK => Some(Self::ThemeToStock),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific part of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    ThemeOverview,
    ThemeToStock {
        /// May be empty when the stock has no canonical ticker
        ticker: String,
        stock_name: String,
    },
    /// Type string outside the known set; kept so validation can report it
    Unrecognized(String),
}

impl DocumentKind {
    pub fn doc_type(&self) -> Option<DocumentType> {
        match self {
            Self::ThemeOverview => Some(DocumentType::ThemeOverview),
            Self::ThemeToStock { .. } => Some(DocumentType::ThemeToStock),
            Self::Unrecognized(_) => None,
        }
    }

    /// Type string as it appears on the wire
    pub fn type_name(&self) -> &str {
        match self {
            Self::ThemeOverview => THEME_OVERVIEW,
            Self::ThemeToStock { .. } => THEME_TO_STOCK,
            Self::Unrecognized(raw) => raw,
        }
    }
}

/// A retrievable unit of knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentRecord", into = "DocumentRecord")]
pub struct RagDocument {
    pub doc_id: String,
    pub kind: DocumentKind,
    pub title: String,
    pub text: String,
    pub source_urls: Vec<String>,
    pub retrieved_at: Option<DateTime<FixedOffset>>,
    pub language: String,
    pub tags: Vec<String>,
    pub theme_id: String,
    pub theme_name: String,
}

impl RagDocument {
    pub fn theme_overview(
        doc_id: impl Into<String>,
        theme_id: impl Into<String>,
        theme_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let theme_name = theme_name.into();
        Self {
            doc_id: doc_id.into(),
            kind: DocumentKind::ThemeOverview,
            title: theme_name.clone(),
            text: text.into(),
            source_urls: Vec::new(),
            retrieved_at: None,
            language: "zh-Hant".to_string(),
            tags: Vec::new(),
            theme_id: theme_id.into(),
            theme_name,
        }
    }

    pub fn theme_to_stock(
        doc_id: impl Into<String>,
        theme_id: impl Into<String>,
        theme_name: impl Into<String>,
        ticker: impl Into<String>,
        stock_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let theme_name = theme_name.into();
        let stock_name = stock_name.into();
        Self {
            doc_id: doc_id.into(),
            title: format!("{} ↔ {}", theme_name, stock_name),
            kind: DocumentKind::ThemeToStock {
                ticker: ticker.into(),
                stock_name,
            },
            text: text.into(),
            source_urls: Vec::new(),
            retrieved_at: None,
            language: "zh-Hant".to_string(),
            tags: Vec::new(),
            theme_id: theme_id.into(),
            theme_name,
        }
    }

    pub fn doc_type(&self) -> Option<DocumentType> {
        self.kind.doc_type()
    }

    pub fn is_theme_overview(&self) -> bool {
        matches!(self.kind, DocumentKind::ThemeOverview)
    }

    pub fn is_theme_to_stock(&self) -> bool {
        matches!(self.kind, DocumentKind::ThemeToStock { .. })
    }

    pub fn ticker(&self) -> Option<&str> {
        match &self.kind {
            DocumentKind::ThemeToStock { ticker, .. } => Some(ticker),
            _ => None,
        }
    }

    pub fn stock_name(&self) -> Option<&str> {
        match &self.kind {
            DocumentKind::ThemeToStock { stock_name, .. } => Some(stock_name),
            _ => None,
        }
    }

    /// Text handed to the embedding provider
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.text)
    }
}

/// Flat JSONL wire shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub doc_id: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub theme_id: String,
    #[serde(default)]
    pub theme_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_name: Option<String>,
}

impl From<DocumentRecord> for RagDocument {
    fn from(record: DocumentRecord) -> Self {
        let kind = match DocumentType::parse(&record.doc_type) {
            Some(DocumentType::ThemeOverview) => DocumentKind::ThemeOverview,
            Some(DocumentType::ThemeToStock) => DocumentKind::ThemeToStock {
                ticker: record.ticker.unwrap_or_default(),
                stock_name: record.stock_name.unwrap_or_default(),
            },
            None => DocumentKind::Unrecognized(record.doc_type),
        };

        Self {
            doc_id: record.doc_id,
            kind,
            title: record.title,
            text: record.text,
            source_urls: record.source_urls,
            retrieved_at: record.retrieved_at,
            language: record.language,
            tags: record.tags,
            theme_id: record.theme_id,
            theme_name: record.theme_name,
        }
    }
}

impl From<RagDocument> for DocumentRecord {
    fn from(doc: RagDocument) -> Self {
        let doc_type = doc.kind.type_name().to_string();
        let (ticker, stock_name) = match doc.kind {
            DocumentKind::ThemeToStock { ticker, stock_name } => (Some(ticker), Some(stock_name)),
            _ => (None, None),
        };

        Self {
            doc_id: doc.doc_id,
            doc_type,
            title: doc.title,
            text: doc.text,
            source_urls: doc.source_urls,
            retrieved_at: doc.retrieved_at,
            language: doc.language,
            tags: doc.tags,
            theme_id: doc.theme_id,
            theme_name: doc.theme_name,
            ticker,
            stock_name,
        }
    }
}

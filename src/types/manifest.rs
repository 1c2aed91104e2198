// Declared shape of the corpus
use serde::{Deserialize, Serialize};

/// Field list every document is expected to carry
pub const DEFAULT_FIELDS: &[&str] = &[
    "doc_id",
    "type",
    "title",
    "text",
    "source_urls",
    "theme_id",
    "theme_name",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub theme_overview: usize,
    pub theme_to_stock: usize,
    pub total: usize,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl Manifest {
    /// Build a manifest whose total is the sum of its per-type counts
    pub fn new(theme_overview: usize, theme_to_stock: usize) -> Self {
        Self {
            theme_overview,
            theme_to_stock,
            total: theme_overview + theme_to_stock,
            fields: default_fields(),
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn declared_sum(&self) -> usize {
        self.theme_overview + self.theme_to_stock
    }
}

pub fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_new_sums_total() {
        let manifest = Manifest::new(15, 75);
        assert_eq!(manifest.total, 90);
        assert_eq!(manifest.declared_sum(), 90);
        assert_eq!(manifest.fields.len(), DEFAULT_FIELDS.len());
    }

    #[test]
    fn test_manifest_json_without_optional_fields() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"theme_overview":2,"theme_to_stock":3,"total":5}"#).unwrap();
        assert_eq!(manifest.total, 5);
        assert!(manifest.fields.is_empty());
        assert!(manifest.note.is_empty());
    }
}

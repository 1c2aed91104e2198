// Structured lookups over a loaded corpus
use serde::Serialize;
use std::collections::HashSet;

use crate::rag::reranking::RelevanceScorer;
use crate::types::{DocumentType, RagDocument};

/// Names listed in a summary
pub const SUMMARY_TOP_N: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total: usize,
    pub theme_overview: usize,
    pub theme_to_stock: usize,
    pub unique_themes: usize,
    pub unique_stocks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub total_documents: usize,
    pub theme_count: usize,
    pub stock_count: usize,
    pub top_themes: Vec<String>,
    pub top_stocks: Vec<String>,
    /// Mean relevance of all documents to the query
    pub relevance_score: f32,
}

/// Read-only view over a document slice
#[derive(Debug, Clone, Copy)]
pub struct CorpusQuery<'a> {
    documents: &'a [RagDocument],
}

impl<'a> CorpusQuery<'a> {
    pub fn new(documents: &'a [RagDocument]) -> Self {
        Self { documents }
    }

    pub fn theme_overviews(&self) -> Vec<&'a RagDocument> {
        self.filter_by_type(DocumentType::ThemeOverview)
    }

    /// Stock relations of the theme with this exact name
    pub fn stocks_by_theme(&self, theme_name: &str) -> Vec<&'a RagDocument> {
        self.documents
            .iter()
            .filter(|d| d.is_theme_to_stock() && d.theme_name == theme_name)
            .collect()
    }

    /// Theme relations of the stock with this exact name
    pub fn themes_by_stock(&self, stock_name: &str) -> Vec<&'a RagDocument> {
        self.documents
            .iter()
            .filter(|d| d.stock_name() == Some(stock_name))
            .collect()
    }

    /// Distinct theme names, first-seen order
    pub fn theme_names(&self) -> Vec<&'a str> {
        unique(self.documents.iter().map(|d| d.theme_name.as_str()))
    }

    /// Distinct stock names, first-seen order
    pub fn stock_names(&self) -> Vec<&'a str> {
        unique(self.documents.iter().filter_map(|d| d.stock_name()))
    }

    pub fn filter_by_type(&self, doc_type: DocumentType) -> Vec<&'a RagDocument> {
        self.documents
            .iter()
            .filter(|d| d.doc_type() == Some(doc_type))
            .collect()
    }

    pub fn filter_by_theme_id(&self, theme_id: &str) -> Vec<&'a RagDocument> {
        self.documents.iter().filter(|d| d.theme_id == theme_id).collect()
    }

    /// Case-insensitive substring match on title, text, theme or stock name
    pub fn search_documents(&self, query: &str) -> Vec<&'a RagDocument> {
        let needle = query.to_lowercase();
        self.documents
            .iter()
            .filter(|d| {
                d.title.to_lowercase().contains(&needle)
                    || d.text.to_lowercase().contains(&needle)
                    || d.theme_name.to_lowercase().contains(&needle)
                    || d.stock_name()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            total: self.documents.len(),
            theme_overview: self.documents.iter().filter(|d| d.is_theme_overview()).count(),
            theme_to_stock: self.documents.iter().filter(|d| d.is_theme_to_stock()).count(),
            unique_themes: self.theme_names().len(),
            unique_stocks: self.stock_names().len(),
        }
    }

    pub fn summary(&self, query: &str) -> CorpusSummary {
        let overviews = self.theme_overviews();
        let relations = self.filter_by_type(DocumentType::ThemeToStock);

        let top_themes = unique(overviews.iter().map(|d| d.theme_name.as_str()))
            .into_iter()
            .take(SUMMARY_TOP_N)
            .map(str::to_string)
            .collect();
        let top_stocks = unique(relations.iter().filter_map(|d| d.stock_name()))
            .into_iter()
            .take(SUMMARY_TOP_N)
            .map(str::to_string)
            .collect();

        let relevance_score = if self.documents.is_empty() {
            0.0
        } else {
            let scorer = RelevanceScorer::new();
            let total: f32 = self.documents.iter().map(|d| scorer.score(d, query)).sum();
            total / self.documents.len() as f32
        };

        CorpusSummary {
            total_documents: self.documents.len(),
            theme_count: overviews.len(),
            stock_count: relations.len(),
            top_themes,
            top_stocks,
            relevance_score,
        }
    }
}

fn unique<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<RagDocument> {
        vec![
            RagDocument::theme_overview("ov.hbm", "theme.hbm", "HBM", "高頻寬記憶體"),
            RagDocument::theme_overview("ov.cowos", "theme.cowos", "CoWoS", "先進封裝"),
            RagDocument::theme_to_stock("ts.hbm.2330", "theme.hbm", "HBM", "2330", "台積電", "封裝"),
            RagDocument::theme_to_stock("ts.hbm.2408", "theme.hbm", "HBM", "2408", "南亞科", "DRAM"),
            RagDocument::theme_to_stock("ts.cowos.2330", "theme.cowos", "CoWoS", "2330", "台積電", "CoWoS 產能"),
        ]
    }

    #[test]
    fn test_lookups() {
        let docs = corpus();
        let query = CorpusQuery::new(&docs);

        assert_eq!(query.theme_overviews().len(), 2);
        assert_eq!(query.stocks_by_theme("HBM").len(), 2);
        assert_eq!(query.themes_by_stock("台積電").len(), 2);
        assert_eq!(query.filter_by_theme_id("theme.cowos").len(), 2);
        assert_eq!(query.theme_names(), vec!["HBM", "CoWoS"]);
        assert_eq!(query.stock_names(), vec!["台積電", "南亞科"]);
    }

    #[test]
    fn test_search_documents_is_case_insensitive() {
        let docs = corpus();
        let query = CorpusQuery::new(&docs);
        let hits: Vec<_> = query.search_documents("cowos").iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(hits, vec!["ov.cowos", "ts.cowos.2330"]);
        assert!(query.search_documents("dram").len() == 1);
    }

    #[test]
    fn test_stats() {
        let docs = corpus();
        assert_eq!(
            CorpusQuery::new(&docs).stats(),
            CorpusStats {
                total: 5,
                theme_overview: 2,
                theme_to_stock: 3,
                unique_themes: 2,
                unique_stocks: 2,
            }
        );
    }

    #[test]
    fn test_summary() {
        let docs = corpus();
        let summary = CorpusQuery::new(&docs).summary("HBM");
        assert_eq!(summary.total_documents, 5);
        assert_eq!(summary.theme_count, 2);
        assert_eq!(summary.stock_count, 3);
        assert_eq!(summary.top_themes, vec!["HBM", "CoWoS"]);
        assert_eq!(summary.top_stocks, vec!["台積電", "南亞科"]);
        assert!(summary.relevance_score > 0.0);

        assert_eq!(CorpusQuery::new(&[]).summary("HBM").relevance_score, 0.0);
    }
}

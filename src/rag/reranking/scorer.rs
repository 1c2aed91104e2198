// Deterministic keyword relevance scoring over the corpus
use serde::{Deserialize, Serialize};

use crate::types::RagDocument;

/// Points awarded per signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Query is a substring of the title
    pub title_match: f32,
    /// Query is a substring of the theme name
    pub theme_match: f32,
    /// Query is a substring of the stock name
    pub stock_match: f32,
    /// Per non-overlapping occurrence in `title + " " + text`
    pub occurrence: f32,
    /// Flat bonus for theme overviews
    pub overview_bonus: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title_match: 10.0,
            theme_match: 8.0,
            stock_match: 8.0,
            occurrence: 2.0,
            overview_bonus: 3.0,
        }
    }
}

/// Document with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument<'a> {
    pub document: &'a RagDocument,
    pub relevance: f32,
}

/// Keyword scorer and candidate filter
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Relevance of `doc` to the whole query string (case-insensitive)
    pub fn score(&self, doc: &RagDocument, query: &str) -> f32 {
        let w = &self.weights;
        let mut score = 0.0;

        if doc.is_theme_overview() {
            score += w.overview_bonus;
        }

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return score;
        }

        if doc.title.to_lowercase().contains(&query) {
            score += w.title_match;
        }
        if doc.theme_name.to_lowercase().contains(&query) {
            score += w.theme_match;
        }
        if doc
            .stock_name()
            .is_some_and(|name| name.to_lowercase().contains(&query))
        {
            score += w.stock_match;
        }

        let content = format!("{} {}", doc.title, doc.text).to_lowercase();
        score += content.matches(query.as_str()).count() as f32 * w.occurrence;

        score
    }

    /// Whether any query token longer than one character appears in the
    /// document's title, text, theme name or stock name
    pub fn is_candidate(&self, doc: &RagDocument, query: &str) -> bool {
        let tokens = query_tokens(query);
        if tokens.is_empty() {
            return false;
        }

        let content = format!(
            "{} {} {} {}",
            doc.title,
            doc.text,
            doc.theme_name,
            doc.stock_name().unwrap_or_default()
        )
        .to_lowercase();

        tokens.iter().any(|token| content.contains(token.as_str()))
    }

    /// Candidates only, by score descending; ties keep corpus order
    pub fn rank<'a>(&self, documents: &'a [RagDocument], query: &str) -> Vec<ScoredDocument<'a>> {
        let mut ranked: Vec<ScoredDocument<'a>> = documents
            .iter()
            .filter(|doc| self.is_candidate(doc, query))
            .map(|doc| ScoredDocument {
                document: doc,
                relevance: self.score(doc, query),
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
    }
}

/// Lowercased whitespace tokens longer than one character
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

// Context builder: bounded, sectioned context text for a query
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::rag::reranking::RelevanceScorer;
use crate::types::RagDocument;

/// Returned when there is nothing to build from
pub const NO_DOCUMENTS_NOTICE: &str = "沒有找到相關的 RAG 資料。";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Default budget in characters
    pub max_length: usize,
    /// Theme overviews summarised up front
    pub overview_limit: usize,
    /// Characters of overview text per summary line
    pub overview_chars: usize,
    /// Unique stocks summarised up front
    pub stock_limit: usize,
    /// Characters of relation text per stock line
    pub stock_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_length: 4000,
            overview_limit: 3,
            overview_chars: 200,
            stock_limit: 5,
            stock_chars: 150,
        }
    }
}

/// Assembled context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text, never longer than the budget
    pub text: String,
    /// Length of `text` in characters
    pub length: usize,
    /// Full documents included in the detail section, in order
    pub document_ids: Vec<String>,
    /// A line or document was left out for lack of budget
    pub truncated: bool,
}

/// Appends whole lines while they fit in the character budget
struct Budget {
    text: String,
    used: usize,
    max: usize,
    truncated: bool,
}

impl Budget {
    fn new(max: usize) -> Self {
        Self {
            text: String::new(),
            used: 0,
            max,
            truncated: false,
        }
    }

    fn push(&mut self, line: &str) -> bool {
        let len = line.chars().count();
        if self.used + len > self.max {
            self.truncated = true;
            return false;
        }
        self.text.push_str(line);
        self.used += len;
        true
    }
}

/// Context builder for query answers
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
    scorer: RelevanceScorer,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            config,
            scorer: RelevanceScorer::new(),
        }
    }

    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Build with the configured default budget
    pub fn build_default(&self, documents: &[RagDocument], query: &str) -> AssembledContext {
        self.build(documents, query, self.config.max_length)
    }

    /// Sections, in order: header, overview summaries, unique stocks, then
    /// full documents by relevance until the next would not fit
    pub fn build(&self, documents: &[RagDocument], query: &str, max_length: usize) -> AssembledContext {
        let mut budget = Budget::new(max_length);
        let mut document_ids = Vec::new();

        if documents.is_empty() {
            budget.push(NO_DOCUMENTS_NOTICE);
            return finish(budget, document_ids);
        }

        budget.push(&format!("基於 RAG 資料庫的查詢：「{}」\n\n", query));

        let overviews: Vec<&RagDocument> = documents.iter().filter(|d| d.is_theme_overview()).collect();
        if !overviews.is_empty()
            && budget.push(&format!("📊 主題概覽 ({} 個主題)：\n", overviews.len()))
        {
            for (i, doc) in overviews.iter().take(self.config.overview_limit).enumerate() {
                budget.push(&format!(
                    "{}. {}：{}\n",
                    i + 1,
                    doc.title,
                    preview(&doc.text, self.config.overview_chars)
                ));
            }
            budget.push("\n");
        }

        let relations: Vec<&RagDocument> = documents.iter().filter(|d| d.is_theme_to_stock()).collect();
        if !relations.is_empty()
            && budget.push(&format!("📈 相關股票 ({} 個關聯)：\n", relations.len()))
        {
            let mut seen = HashSet::new();
            let unique = relations.iter().filter(|d| {
                d.stock_name()
                    .is_some_and(|name| !name.is_empty() && seen.insert(name.to_string()))
            });
            for (i, doc) in unique.take(self.config.stock_limit).enumerate() {
                budget.push(&format!(
                    "{}. {} ({}) - {}：{}\n",
                    i + 1,
                    doc.stock_name().unwrap_or_default(),
                    doc.ticker().unwrap_or_default(),
                    doc.theme_name,
                    preview(&doc.text, self.config.stock_chars)
                ));
            }
            budget.push("\n");
        }

        if budget.push("📋 詳細資料：\n") {
            for scored in self.scorer.rank(documents, query) {
                let doc = scored.document;
                let label = if doc.is_theme_overview() { "主題" } else { "股票" };
                if !budget.push(&format!("【{}】{}\n{}\n\n", label, doc.title, doc.text)) {
                    break;
                }
                document_ids.push(doc.doc_id.clone());
            }
        }

        finish(budget, document_ids)
    }
}

fn finish(budget: Budget, document_ids: Vec<String>) -> AssembledContext {
    AssembledContext {
        length: budget.used,
        text: budget.text,
        document_ids,
        truncated: budget.truncated,
    }
}

/// First `max` characters, with `...` when cut
fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

//! Format-specific corpus parsers
//!
//! Documents arrive as line-delimited JSON. A corrupt line is logged and
//! skipped; it never fails the whole load. Manifests arrive either as JSON or
//! as a small `key: value` text file.

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::errors::{RagError, Result};
use crate::types::{default_fields, Manifest, RagDocument};

/// Lines parsed concurrently per batch
pub const DEFAULT_BATCH_SIZE: usize = 10;

const PREVIEW_CHARS: usize = 100;

/// Parse one JSONL line; `None` for blank or corrupt lines
pub fn parse_document_line(line_no: usize, line: &str) -> Option<RagDocument> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<RagDocument>(trimmed) {
        Ok(doc) => Some(doc),
        Err(e) => {
            let preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
            warn!(line = line_no + 1, error = %e, %preview, "Skipping unparseable document line");
            None
        }
    }
}

/// Parse JSONL content in fixed-size batches.
///
/// Lines inside a batch are parsed concurrently, batches run one after the
/// other, and the output keeps the original line order.
pub async fn parse_documents_jsonl(content: &str, batch_size: usize) -> Vec<RagDocument> {
    let lines: Vec<(usize, &str)> = content.lines().enumerate().collect();
    let batch_size = batch_size.max(1);
    let mut documents = Vec::with_capacity(lines.len());

    for batch in lines.chunks(batch_size) {
        let parsed = join_all(
            batch
                .iter()
                .map(|(line_no, line)| async move { parse_document_line(*line_no, line) }),
        )
        .await;
        documents.extend(parsed.into_iter().flatten());
    }

    debug!(lines = lines.len(), documents = documents.len(), "Parsed JSONL corpus");
    documents
}

/// Parse a JSON manifest
pub fn parse_manifest_json(content: &str) -> Result<Manifest> {
    serde_json::from_str(content).map_err(|e| RagError::ManifestParse(e.to_string()))
}

/// Parse the `key: value` manifest text format.
///
/// Markdown list markers, headings and emphasis are tolerated. Counts take the
/// first integer on the line; `total` defaults to the sum of the per-type
/// counts and `fields` to the standard field list.
pub fn parse_manifest_text(content: &str) -> Result<Manifest> {
    let mut theme_overview = None;
    let mut theme_to_stock = None;
    let mut total = None;
    let mut fields = Vec::new();
    let mut note = String::new();

    for raw in content.lines() {
        let line = raw
            .trim()
            .trim_start_matches(|c: char| c == '-' || c == '*' || c == '#' || c.is_whitespace())
            .replace("**", "")
            .replace('`', "");

        let Some((key, value)) = split_key_value(&line) else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key.contains("theme_overview") {
            theme_overview = Some(first_integer(value, "theme_overview")?);
        } else if key.contains("theme_to_stock") {
            theme_to_stock = Some(first_integer(value, "theme_to_stock")?);
        } else if key.contains("total") {
            total = Some(first_integer(value, "total")?);
        } else if key.contains("fields") {
            fields = value
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        } else if key.contains("note") {
            note = value.to_string();
        }
    }

    let theme_overview = theme_overview
        .ok_or_else(|| RagError::ManifestParse("missing theme_overview count".to_string()))?;
    let theme_to_stock = theme_to_stock
        .ok_or_else(|| RagError::ManifestParse("missing theme_to_stock count".to_string()))?;

    Ok(Manifest {
        theme_overview,
        theme_to_stock,
        total: total.unwrap_or(theme_overview + theme_to_stock),
        fields: if fields.is_empty() { default_fields() } else { fields },
        note,
    })
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    // Full-width colon shows up in hand-edited zh-Hant manifests
    line.split_once(':').or_else(|| line.split_once('：'))
}

fn first_integer(value: &str, key: &str) -> Result<usize> {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits
        .parse()
        .map_err(|_| RagError::ManifestParse(format!("no count for {key}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overview_line(id: &str) -> String {
        format!(
            r#"{{"doc_id":"{id}","type":"theme_overview","title":"T","text":"body","theme_id":"theme.t","theme_name":"T"}}"#
        )
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let content = format!(
            "{}\n{{not json\n\n{}\n",
            overview_line("a"),
            overview_line("b")
        );
        let docs = parse_documents_jsonl(&content, DEFAULT_BATCH_SIZE).await;
        let ids: Vec<_> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_order_preserved_across_batches() {
        let content: Vec<String> = (0..25).map(|i| overview_line(&format!("doc{i}"))).collect();
        let docs = parse_documents_jsonl(&content.join("\n"), 4).await;
        assert_eq!(docs.len(), 25);
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.doc_id, format!("doc{i}"));
        }
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_clamped() {
        let docs = parse_documents_jsonl(&overview_line("only"), 0).await;
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_parse_manifest_text() {
        let content = "# RAG manifest\n\
                       - **theme_overview**: 15\n\
                       - **theme_to_stock**: 75\n\
                       - total: 90\n\
                       - fields: doc_id, type, title, text\n\
                       - note: Trending Top 15\n";
        let manifest = parse_manifest_text(content).unwrap();
        assert_eq!(manifest.theme_overview, 15);
        assert_eq!(manifest.theme_to_stock, 75);
        assert_eq!(manifest.total, 90);
        assert_eq!(manifest.fields, vec!["doc_id", "type", "title", "text"]);
        assert_eq!(manifest.note, "Trending Top 15");
    }

    #[test]
    fn test_manifest_text_defaults() {
        let manifest = parse_manifest_text("theme_overview：2 份\ntheme_to_stock: 3").unwrap();
        assert_eq!(manifest.total, 5);
        assert!(!manifest.fields.is_empty());
    }

    #[test]
    fn test_manifest_text_missing_count_is_error() {
        let err = parse_manifest_text("theme_overview: 2\nnote: partial").unwrap_err();
        assert!(matches!(err, RagError::ManifestParse(_)));
    }

    #[test]
    fn test_parse_manifest_json() {
        let manifest =
            parse_manifest_json(r#"{"theme_overview":1,"theme_to_stock":1,"total":2,"fields":["doc_id"],"note":""}"#)
                .unwrap();
        assert_eq!(manifest.total, 2);
        assert!(parse_manifest_json("not json").is_err());
    }
}

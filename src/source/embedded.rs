// Bundled corpus snapshot, compiled into the binary. No I/O, never fails.
use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

use crate::source::parser::{parse_document_line, parse_manifest_json};
use crate::types::{default_fields, DocumentSet, Manifest};

/// Version tag of the bundled snapshot (retrieval date of its sources)
pub const SNAPSHOT_VERSION: &str = "2025-08-28";

const DOCS_JSONL: &str = include_str!("../../data/embedded/docs.jsonl");
const MANIFEST_JSON: &str = include_str!("../../data/embedded/manifest.json");

static DOCUMENTS: OnceLock<DocumentSet> = OnceLock::new();
static MANIFEST: OnceLock<Manifest> = OnceLock::new();

/// Bundled documents, parsed once per process
pub fn documents() -> DocumentSet {
    DOCUMENTS
        .get_or_init(|| {
            let docs: Vec<_> = DOCS_JSONL
                .lines()
                .enumerate()
                .filter_map(|(line_no, line)| parse_document_line(line_no, line))
                .collect();
            debug!(count = docs.len(), version = SNAPSHOT_VERSION, "Loaded embedded corpus");
            Arc::new(docs)
        })
        .clone()
}

/// Bundled manifest
pub fn manifest() -> Manifest {
    MANIFEST
        .get_or_init(|| match parse_manifest_json(MANIFEST_JSON) {
            Ok(manifest) => manifest,
            Err(e) => {
                // Describe the bundled documents rather than fail
                error!(error = %e, "Embedded manifest is unreadable, deriving from documents");
                let docs = documents();
                let theme_overview = docs.iter().filter(|d| d.is_theme_overview()).count();
                let theme_to_stock = docs.iter().filter(|d| d.is_theme_to_stock()).count();
                Manifest {
                    theme_overview,
                    theme_to_stock,
                    total: docs.len(),
                    fields: default_fields(),
                    note: format!("Derived from embedded snapshot {}", SNAPSHOT_VERSION),
                }
            }
        })
        .clone()
}

// Local filesystem tier (development only)
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{RagError, Result};
use crate::source::parser::{parse_documents_jsonl, parse_manifest_json, parse_manifest_text};
use crate::types::{Manifest, RagDocument};

const TIER: &str = "filesystem";

/// Manifest candidates, tried in order relative to the base directory
pub const MANIFEST_CANDIDATES: &[&str] = &[
    "data/rag/manifest.json",
    "data/rag/manifest.md",
    "public/rag/manifest.json",
];

/// Document candidates, tried in order relative to the base directory
pub const DOCUMENT_CANDIDATES: &[&str] = &[
    "public/rag/docs.jsonl",
    "apps/web/public/rag/docs.jsonl",
    "data/rag/docs.jsonl",
];

#[derive(Debug, Clone)]
pub struct FilesystemSource {
    base_dir: PathBuf,
    batch_size: usize,
}

impl FilesystemSource {
    pub fn new(base_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            batch_size,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Whether any corpus file exists under the base directory
    pub fn has_local_corpus(&self) -> bool {
        MANIFEST_CANDIDATES
            .iter()
            .chain(DOCUMENT_CANDIDATES)
            .any(|p| self.base_dir.join(p).is_file())
    }

    async fn find_first(&self, candidates: &[&str]) -> Option<PathBuf> {
        for candidate in candidates {
            let path = self.base_dir.join(candidate);
            debug!(path = %path.display(), "Trying local corpus path");
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }
        None
    }

    pub async fn load_manifest(&self) -> Result<Manifest> {
        let path = self
            .find_first(MANIFEST_CANDIDATES)
            .await
            .ok_or_else(|| RagError::unavailable(TIER, "no manifest file in candidate paths"))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RagError::unavailable(TIER, format!("{}: {}", path.display(), e)))?;

        let manifest = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => parse_manifest_json(&content)?,
            _ => parse_manifest_text(&content)?,
        };

        info!(path = %path.display(), total = manifest.total, "Loaded manifest from file system");
        Ok(manifest)
    }

    pub async fn load_documents(&self) -> Result<Vec<RagDocument>> {
        let path = self
            .find_first(DOCUMENT_CANDIDATES)
            .await
            .ok_or_else(|| RagError::unavailable(TIER, "no documents file in candidate paths"))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RagError::unavailable(TIER, format!("{}: {}", path.display(), e)))?;

        let documents = parse_documents_jsonl(&content, self.batch_size).await;
        info!(path = %path.display(), count = documents.len(), "Loaded documents from file system");
        Ok(documents)
    }
}

//! Document source resolver
//!
//! Returns the manifest and the document set from the tier allowed by the
//! deployment mode, reading through the shared corpus cache. Manifest and
//! documents are resolved independently with the same algorithm:
//!
//! - `Embedded`: bundled snapshot, no I/O
//! - `Local`: filesystem candidates, then the dev HTTP server
//! - `Remote`: production HTTP server
//!
//! When every allowed tier fails the call fails; nothing is fabricated.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheLookup, CacheSlot, CorpusCache};
use crate::errors::{RagError, Result};
use crate::source::embedded;
use crate::source::filesystem::FilesystemSource;
use crate::source::mode::DeploymentMode;
use crate::source::remote::RemoteSource;
use crate::types::{DocumentSet, Manifest};

/// Clears a slot's refresh flag when dropped, including when the refresh panics
struct RefreshGuard<T: Clone + 'static> {
    cache: Arc<CorpusCache>,
    slot: fn(&CorpusCache) -> &CacheSlot<T>,
}

impl<T: Clone + 'static> Drop for RefreshGuard<T> {
    fn drop(&mut self) {
        (self.slot)(&self.cache).end_refresh();
    }
}

#[derive(Clone)]
pub struct DocumentResolver {
    mode: DeploymentMode,
    filesystem: FilesystemSource,
    remote: RemoteSource,
    cache: Arc<CorpusCache>,
}

impl DocumentResolver {
    /// `remote` must point at the dev server for `Local` and at the
    /// production server for `Remote`; it is unused in `Embedded` mode.
    pub fn new(
        mode: DeploymentMode,
        filesystem: FilesystemSource,
        remote: RemoteSource,
        cache: Arc<CorpusCache>,
    ) -> Self {
        info!(%mode, base_url = remote.base_url(), "Document resolver ready");
        Self {
            mode,
            filesystem,
            remote,
            cache,
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn cache(&self) -> &Arc<CorpusCache> {
        &self.cache
    }

    /// Manifest through the cache
    pub async fn load_manifest(&self) -> Result<Manifest> {
        if let Some(manifest) = self.serve_cached(|c| &c.manifest, |r| async move {
            let manifest = r.fetch_manifest().await?;
            r.cache.store_manifest(manifest);
            Ok(())
        }) {
            return Ok(manifest);
        }

        let manifest = self.fetch_manifest().await?;
        self.cache.store_manifest(manifest.clone());
        Ok(manifest)
    }

    /// Document set through the cache
    pub async fn load_documents(&self) -> Result<DocumentSet> {
        if let Some(documents) = self.serve_cached(|c| &c.documents, |r| async move {
            let documents = r.fetch_documents().await?;
            r.cache.store_documents(documents);
            Ok(())
        }) {
            return Ok(documents);
        }

        let documents = self.fetch_documents().await?;
        self.cache.store_documents(documents.clone());
        Ok(documents)
    }

    /// Manifest and documents, fetched concurrently
    pub async fn load_corpus(&self) -> Result<(Manifest, DocumentSet)> {
        tokio::try_join!(self.load_manifest(), self.load_documents())
    }

    /// Serve a cache hit; on a stale hit also spawn one background refresh.
    fn serve_cached<T, F, Fut>(&self, slot: fn(&CorpusCache) -> &CacheSlot<T>, refresh: F) -> Option<T>
    where
        T: Clone + 'static,
        F: FnOnce(DocumentResolver) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        match slot(&self.cache).lookup() {
            CacheLookup::Fresh(data) => {
                debug!("Cache hit");
                Some(data)
            }
            CacheLookup::Stale(data) => {
                if slot(&self.cache).begin_refresh() {
                    debug!("Stale cache hit, refreshing in background");
                    let task = refresh(self.clone());
                    let guard = RefreshGuard {
                        cache: self.cache.clone(),
                        slot,
                    };
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            handle.spawn(async move {
                                let _guard = guard;
                                if let Err(e) = task.await {
                                    warn!(error = %e, "Background corpus refresh failed");
                                }
                            });
                        }
                        Err(_) => drop(guard),
                    }
                }
                Some(data)
            }
            CacheLookup::Miss => None,
        }
    }

    /// Manifest straight from the tiers, bypassing the cache
    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        match self.mode {
            DeploymentMode::Embedded => {
                debug!("Using embedded manifest");
                Ok(embedded::manifest())
            }
            DeploymentMode::Local => {
                let fs_err = match self.filesystem.load_manifest().await {
                    Ok(manifest) => return Ok(manifest),
                    Err(e) => {
                        debug!(error = %e, "Filesystem manifest unavailable, trying HTTP");
                        e
                    }
                };
                self.remote
                    .fetch_manifest()
                    .await
                    .map_err(|http_err| exhausted("manifest", &[&fs_err, &http_err]))
            }
            DeploymentMode::Remote => self
                .remote
                .fetch_manifest()
                .await
                .map_err(|http_err| exhausted("manifest", &[&http_err])),
        }
    }

    /// Documents straight from the tiers, bypassing the cache
    pub async fn fetch_documents(&self) -> Result<DocumentSet> {
        match self.mode {
            DeploymentMode::Embedded => {
                debug!("Using embedded documents");
                Ok(embedded::documents())
            }
            DeploymentMode::Local => {
                let fs_err = match self.filesystem.load_documents().await {
                    Ok(documents) => return Ok(Arc::new(documents)),
                    Err(e) => {
                        debug!(error = %e, "Filesystem documents unavailable, trying HTTP");
                        e
                    }
                };
                self.remote
                    .fetch_documents()
                    .await
                    .map(Arc::new)
                    .map_err(|http_err| exhausted("documents", &[&fs_err, &http_err]))
            }
            DeploymentMode::Remote => self
                .remote
                .fetch_documents()
                .await
                .map(Arc::new)
                .map_err(|http_err| exhausted("documents", &[&http_err])),
        }
    }
}

fn exhausted(artifact: &str, causes: &[&RagError]) -> RagError {
    let details = causes
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    warn!(artifact, %details, "Every source tier failed");
    RagError::SourcesExhausted {
        artifact: artifact.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, ManualClock};
    use std::time::Duration;
    use tempfile::TempDir;

    fn resolver(mode: DeploymentMode, base_dir: &std::path::Path) -> DocumentResolver {
        let remote = RemoteSource::new("http://127.0.0.1:9/rag", Duration::from_secs(2), 10).unwrap();
        DocumentResolver::new(
            mode,
            FilesystemSource::new(base_dir, 10),
            remote,
            Arc::new(CorpusCache::default()),
        )
    }

    #[tokio::test]
    async fn test_embedded_never_fails() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver(DeploymentMode::Embedded, temp.path());
        let (manifest, documents) = resolver.load_corpus().await.unwrap();
        assert_eq!(manifest.total, documents.len());
    }

    #[tokio::test]
    async fn test_local_exhaustion_is_hard_error() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver(DeploymentMode::Local, temp.path());
        let err = resolver.load_documents().await.unwrap_err();
        match err {
            RagError::SourcesExhausted { artifact, details } => {
                assert_eq!(artifact, "documents");
                assert!(details.contains("filesystem"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(resolver.cache().documents.get().is_none());
    }

    #[tokio::test]
    async fn test_cache_read_through() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data/rag");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("manifest.md"), "theme_overview: 1\ntheme_to_stock: 2\n").unwrap();

        let resolver = resolver(DeploymentMode::Local, temp.path());
        assert_eq!(resolver.load_manifest().await.unwrap().total, 3);

        // Served from cache even after the file changes
        std::fs::write(dir.join("manifest.md"), "theme_overview: 5\ntheme_to_stock: 5\n").unwrap();
        assert_eq!(resolver.load_manifest().await.unwrap().total, 3);

        resolver.cache().clear();
        assert_eq!(resolver.load_manifest().await.unwrap().total, 10);
    }

    #[tokio::test]
    async fn test_expired_cache_reloads() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data/rag");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("manifest.md"), "theme_overview: 1\ntheme_to_stock: 1\n").unwrap();

        let clock = Arc::new(ManualClock::new());
        let policy = CachePolicy {
            manifest_ttl: Duration::from_secs(10),
            documents_ttl: Duration::from_secs(10),
            stale_after: None,
        };
        let cache = Arc::new(CorpusCache::with_clock(policy, clock.clone()));
        let remote = RemoteSource::new("http://127.0.0.1:9", Duration::from_secs(2), 10).unwrap();
        let resolver = DocumentResolver::new(
            DeploymentMode::Local,
            FilesystemSource::new(temp.path(), 10),
            remote,
            cache,
        );

        assert_eq!(resolver.load_manifest().await.unwrap().total, 2);
        std::fs::write(dir.join("manifest.md"), "theme_overview: 3\ntheme_to_stock: 3\n").unwrap();
        clock.advance(Duration::from_secs(11));
        assert_eq!(resolver.load_manifest().await.unwrap().total, 6);
    }

    #[tokio::test]
    async fn test_panicking_refresh_releases_flag() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let policy = CachePolicy {
            manifest_ttl: Duration::from_secs(10),
            documents_ttl: Duration::from_secs(10),
            stale_after: Some(Duration::from_secs(5)),
        };
        let cache = Arc::new(CorpusCache::with_clock(policy, clock.clone()));
        let remote = RemoteSource::new("http://127.0.0.1:9", Duration::from_secs(2), 10).unwrap();
        let resolver = DocumentResolver::new(
            DeploymentMode::Embedded,
            FilesystemSource::new(temp.path(), 10),
            remote,
            cache,
        );

        resolver.cache().store_manifest(Manifest::new(1, 1));
        clock.advance(Duration::from_secs(6));

        let served = resolver.serve_cached(
            |c| &c.manifest,
            |_| async {
                if true {
                    panic!("refresh blew up");
                }
                Ok::<(), RagError>(())
            },
        );
        assert_eq!(served.map(|m| m.total), Some(2));

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // The next stale hit may schedule another refresh
        assert!(resolver.cache().manifest.begin_refresh());
    }
}

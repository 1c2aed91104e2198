//! Process-wide corpus cache
//!
//! One [`CorpusCache`] is built at startup and shared by `Arc`. It holds one
//! slot per artifact kind. Writes are last-write-wins; reads never mutate, so
//! an expired entry stays in place (and is ignored) until the next `set`.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::entry::CacheEntry;
use crate::types::{DocumentSet, Manifest};

/// Default TTL for both artifacts (five minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Result of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Fresh(T),
    /// Still usable, refresh recommended
    Stale(T),
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Fresh(data) | Self::Stale(data) => Some(data),
            Self::Miss => None,
        }
    }
}

/// Per-artifact TTL settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub manifest_ttl: Duration,
    pub documents_ttl: Duration,
    pub stale_after: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            manifest_ttl: DEFAULT_TTL,
            documents_ttl: DEFAULT_TTL,
            stale_after: Some(Duration::from_secs(4 * 60)),
        }
    }
}

/// Snapshot of one slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotStats {
    pub cached: bool,
    pub age_ms: Option<u64>,
    pub expired: bool,
    pub stale: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub manifest: SlotStats,
    pub documents: SlotStats,
}

/// Single-artifact TTL slot
pub struct CacheSlot<T> {
    name: &'static str,
    entry: RwLock<Option<CacheEntry<T>>>,
    refreshing: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> CacheSlot<T> {
    pub fn new(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            entry: RwLock::new(None),
            refreshing: AtomicBool::new(false),
            clock,
        }
    }

    pub fn set(&self, data: T, ttl: Duration, stale_after: Option<Duration>) {
        let entry = CacheEntry::new(data, self.clock.now(), ttl, stale_after);
        *self.entry.write().unwrap_or_else(|e| e.into_inner()) = Some(entry);
        debug!(slot = self.name, ttl_ms = ttl.as_millis() as u64, "Cache set");
    }

    pub fn lookup(&self) -> CacheLookup<T> {
        let now = self.clock.now();
        let guard = self.entry.read().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            None => CacheLookup::Miss,
            Some(entry) if entry.is_expired(now) => {
                debug!(slot = self.name, "Cache entry expired");
                CacheLookup::Miss
            }
            Some(entry) if entry.is_stale(now) => CacheLookup::Stale(entry.data.clone()),
            Some(entry) => CacheLookup::Fresh(entry.data.clone()),
        }
    }

    /// Data or miss; stale entries count as hits
    pub fn get(&self) -> Option<T> {
        self.lookup().into_option()
    }

    pub fn clear(&self) {
        *self.entry.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.refreshing.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> SlotStats {
        let now = self.clock.now();
        let guard = self.entry.read().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            None => SlotStats::default(),
            Some(entry) => SlotStats {
                cached: true,
                age_ms: Some(entry.age(now).as_millis() as u64),
                expired: entry.is_expired(now),
                stale: entry.is_stale(now),
            },
        }
    }

    /// Claim the background refresh for this slot; false if one is running
    pub fn begin_refresh(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_refresh(&self) {
        self.refreshing.store(false, Ordering::SeqCst);
    }
}

/// Cache for the manifest and document set
pub struct CorpusCache {
    pub manifest: CacheSlot<Manifest>,
    pub documents: CacheSlot<DocumentSet>,
    policy: CachePolicy,
}

impl CorpusCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            manifest: CacheSlot::new("manifest", clock.clone()),
            documents: CacheSlot::new("documents", clock),
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store_manifest(&self, manifest: Manifest) {
        self.manifest
            .set(manifest, self.policy.manifest_ttl, self.policy.stale_after);
    }

    pub fn store_documents(&self, documents: DocumentSet) {
        self.documents
            .set(documents, self.policy.documents_ttl, self.policy.stale_after);
    }

    pub fn clear(&self) {
        self.manifest.clear();
        self.documents.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            manifest: self.manifest.stats(),
            documents: self.documents.stats(),
        }
    }
}

impl Default for CorpusCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

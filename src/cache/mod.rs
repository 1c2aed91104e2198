//! TTL cache for corpus artifacts
//!
//! Components:
//! - Clock: injectable time source
//! - CacheEntry: data plus its TTL / staleness bounds
//! - CorpusCache: one slot each for the manifest and the document set

pub mod clock;
pub mod entry;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use manager::{CacheLookup, CachePolicy, CacheSlot, CacheStats, CorpusCache, SlotStats};

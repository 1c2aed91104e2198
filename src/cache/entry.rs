use std::time::{Duration, Instant};

/// Cached artifact with its age bounds
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
    /// Age after which the entry is still served but should be refreshed
    pub stale_after: Option<Duration>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: Instant, ttl: Duration, stale_after: Option<Duration>) -> Self {
        Self {
            data,
            timestamp,
            ttl,
            stale_after,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.stale_after
            .map(|stale| self.age(now) > stale)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_strictly_after_ttl() {
        let start = Instant::now();
        let entry = CacheEntry::new(1, start, Duration::from_secs(10), Some(Duration::from_secs(5)));

        assert!(!entry.is_stale(start + Duration::from_secs(5)));
        assert!(entry.is_stale(start + Duration::from_secs(6)));
        assert!(!entry.is_expired(start + Duration::from_secs(10)));
        assert!(entry.is_expired(start + Duration::from_secs(11)));
    }

    #[test]
    fn test_no_stale_threshold() {
        let start = Instant::now();
        let entry = CacheEntry::new("x", start, Duration::from_secs(10), None);
        assert!(!entry.is_stale(start + Duration::from_secs(9)));
    }
}

//! Process-wide TTL memory cache.
//!
//! Entries expire lazily: a read past the TTL evicts the entry and misses.
//! A [`SweeperHandle`] additionally evicts everything expired on a fixed
//! period while the page is alive. Absent and expired are the same miss.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use offgrid_core::{SharedClock, SystemClock, TimedEntry};
use tracing::{debug, trace};

use crate::task::TaskHandle;

/// Handle to a running sweeper. Aborts the sweeper on drop.
pub type SweeperHandle = TaskHandle;

/// Default time-to-live of memory cache entries.
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Snapshot of the memory cache size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Physically stored entries.
    pub entries: usize,
    /// Stored entries already past their TTL.
    pub expired: usize,
}

/// Short-lived keyed cache shared by everything on one page.
///
/// Clones share the same entries.
///
/// ```
/// use std::time::Duration;
/// use std::sync::Arc;
/// use offgrid_core::ManualClock;
/// use offgrid_page::MemoryCache;
///
/// let clock = ManualClock::default();
/// let cache = MemoryCache::with_clock(Duration::from_secs(300), Arc::new(clock.clone()));
///
/// cache.set("cities", vec!["beijing"], Some(Duration::from_millis(100)));
/// clock.advance(Duration::from_millis(150));
/// assert_eq!(cache.get("cities"), None);
/// ```
pub struct MemoryCache<V> {
    entries: Arc<DashMap<String, TimedEntry<V>>>,
    clock: SharedClock,
    default_ttl: Duration,
}

impl<V> Clone for MemoryCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V> std::fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl<V> Default for MemoryCache<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_TTL)
    }
}

impl<V> MemoryCache<V>
where
    V: Clone,
{
    /// Cache on the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Cache on an explicit clock.
    pub fn with_clock(default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            default_ttl,
        }
    }

    /// Stores `value`, stamped now, for `ttl` or the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let entry = TimedEntry::new(value, self.clock.now(), ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key.into(), entry);
    }

    /// Returns the value if it has not expired; evicts it otherwise.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value().value().clone());
            }
        }
        trace!(key, "memory cache entry expired");
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Whether a live entry exists. Evicts an expired one.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes an entry, returning its value if it was still live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.into_value())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts every expired entry and returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                evicted += 1;
            }
            !expired
        });
        evicted
    }

    /// Current size, counting expired entries not yet evicted.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let expired = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .count();
        CacheStats {
            entries: self.entries.len(),
            expired,
        }
    }
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Runs [`sweep`](Self::sweep) every `interval` on the tokio runtime.
    ///
    /// The sweeper stops when the returned handle is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            // tokio::time::interval panics on a zero period.
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = cache.sweep();
                if evicted > 0 {
                    debug!(evicted, "memory cache swept");
                }
            }
        });
        TaskHandle::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use offgrid_core::ManualClock;
    use pretty_assertions::assert_eq;

    use super::*;

    fn cache() -> (MemoryCache<String>, ManualClock) {
        let clock = ManualClock::default();
        (
            MemoryCache::with_clock(DEFAULT_MEMORY_TTL, Arc::new(clock.clone())),
            clock,
        )
    }

    #[test]
    fn expired_entry_misses_and_is_evicted() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_owned(), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(100));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance(Duration::from_millis(50));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);

        cache.clear();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn default_ttl_is_five_minutes() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_owned(), None);

        clock.advance(Duration::from_secs(299));
        assert!(cache.has("k"));
        clock.advance(Duration::from_secs(2));
        assert!(!cache.has("k"));
    }

    #[test]
    fn sweep_and_stats() {
        let (cache, clock) = cache();
        cache.set("short", "a".to_owned(), Some(Duration::from_secs(1)));
        cache.set("long", "b".to_owned(), Some(Duration::from_secs(60)));
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.stats(), CacheStats { entries: 2, expired: 1 });
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.stats(), CacheStats { entries: 1, expired: 0 });
    }

    #[test]
    fn remove_returns_only_live_values() {
        let (cache, clock) = cache();
        cache.set("a", "1".to_owned(), Some(Duration::from_secs(1)));
        cache.set("b", "2".to_owned(), Some(Duration::from_secs(1)));

        assert_eq!(cache.remove("a").as_deref(), Some("1"));
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.remove("b"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_periodically_until_dropped() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_owned(), Some(Duration::from_secs(30)));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));

        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(cache.len(), 0);

        drop(sweeper);
        cache.set("k", "v".to_owned(), Some(Duration::from_secs(30)));
        clock.advance(Duration::from_secs(120));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_sweeper_keeps_running() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_owned(), Some(Duration::from_secs(1)));
        let sweeper = cache.spawn_sweeper(Duration::ZERO);

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.len(), 0);
        assert!(!sweeper.is_finished());
    }
}

//! Namespaced persisted cache with offline and backup tiers.
//!
//! Every logical key may live in up to three slots of the key/value store:
//!
//! | slot    | storage key                | TTL                |
//! |---------|----------------------------|--------------------|
//! | primary | `{namespace}{key}`         | ttl                |
//! | offline | `{namespace}offline_{key}` | ttl × offline mult |
//! | backup  | `{namespace}backup_{key}`  | ttl × backup mult  |
//!
//! [`PersistentCache::smart_get`] reads primary, then offline (only while
//! offline), then backup. Storage failures never reach the caller: reads
//! degrade to a miss and writes report `false`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use offgrid_backend::{KeyValueStore, StorageError};
use offgrid_core::{SharedClock, SystemClock, TimedEntry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PageConfig;
use crate::connectivity::Connectivity;
use crate::task::TaskHandle;

const OFFLINE_TAG: &str = "offline_";
const BACKUP_TAG: &str = "backup_";

#[derive(Debug, Error)]
enum PageCacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("malformed entry: {0}")]
    Json(#[from] serde_json::Error),
}

/// Called after connectivity returns and stale offline data was purged.
pub trait RefreshHook: Send + Sync {
    /// Refresh whatever the page considers stale.
    fn refresh(&self);
}

/// [`RefreshHook`] that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

impl RefreshHook for NoRefresh {
    fn refresh(&self) {}
}

/// Importance of a smart write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Primary (or offline) slot only.
    #[default]
    Normal,
    /// Additionally keeps a backup copy.
    High,
}

/// Options of [`PersistentCache::smart_set`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartSetOptions {
    /// TTL of the primary slot; the cache default when `None`.
    pub ttl: Option<Duration>,
    /// Write priority.
    pub priority: Priority,
    /// Whether the data came from, and goes stale without, the network.
    pub network_dependent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary,
    Offline,
    Backup,
}

impl Slot {
    fn tag(self) -> &'static str {
        match self {
            Slot::Primary => "",
            Slot::Offline => OFFLINE_TAG,
            Slot::Backup => BACKUP_TAG,
        }
    }
}

/// Persisted key/value cache for one page namespace.
///
/// Clones share the store, clock and connectivity flag.
pub struct PersistentCache<K> {
    store: Arc<K>,
    namespace: Arc<str>,
    ttl: Duration,
    offline_multiplier: u32,
    backup_multiplier: u32,
    clock: SharedClock,
    connectivity: Connectivity,
    refresh: Arc<dyn RefreshHook>,
}

impl<K> Clone for PersistentCache<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: Arc::clone(&self.namespace),
            ttl: self.ttl,
            offline_multiplier: self.offline_multiplier,
            backup_multiplier: self.backup_multiplier,
            clock: Arc::clone(&self.clock),
            connectivity: self.connectivity.clone(),
            refresh: Arc::clone(&self.refresh),
        }
    }
}

impl<K> fmt::Debug for PersistentCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("online", &self.connectivity.is_online())
            .finish_non_exhaustive()
    }
}

impl<K> PersistentCache<K>
where
    K: KeyValueStore,
{
    /// Cache over `store` with the namespace, TTL and multipliers of `config`.
    pub fn new(store: K, config: &PageConfig, connectivity: Connectivity) -> Self {
        Self {
            store: Arc::new(store),
            namespace: Arc::from(config.namespace.as_str()),
            ttl: config.persist_ttl,
            offline_multiplier: config.offline_ttl_multiplier,
            backup_multiplier: config.backup_ttl_multiplier,
            clock: Arc::new(SystemClock),
            connectivity,
            refresh: Arc::new(NoRefresh),
        }
    }

    /// Replace the clock.
    pub fn with_clock(self, clock: SharedClock) -> Self {
        Self { clock, ..self }
    }

    /// Replace the hook run after connectivity returns.
    pub fn with_refresh_hook(self, refresh: Arc<dyn RefreshHook>) -> Self {
        Self { refresh, ..self }
    }

    /// The namespace every key is stored under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The connectivity flag this cache consults.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn storage_key(&self, slot: Slot, key: &str) -> String {
        format!("{}{}{}", self.namespace, slot.tag(), key)
    }

    fn slot_ttl(&self, slot: Slot, ttl: Duration) -> Duration {
        match slot {
            Slot::Primary => ttl,
            Slot::Offline => ttl.saturating_mul(self.offline_multiplier),
            Slot::Backup => ttl.saturating_mul(self.backup_multiplier),
        }
    }

    fn try_write<T>(&self, slot: Slot, key: &str, value: &T, ttl: Duration) -> Result<(), PageCacheError>
    where
        T: Serialize + ?Sized,
    {
        let entry = TimedEntry::new(serde_json::to_value(value)?, self.clock.now(), self.slot_ttl(slot, ttl));
        let raw = serde_json::to_string(&entry)?;
        self.store.set_item(&self.storage_key(slot, key), &raw)?;
        Ok(())
    }

    fn write<T>(&self, slot: Slot, key: &str, value: &T, ttl: Option<Duration>) -> bool
    where
        T: Serialize + ?Sized,
    {
        match self.try_write(slot, key, value, ttl.unwrap_or(self.ttl)) {
            Ok(()) => true,
            Err(error) => {
                warn!(key, slot = slot.tag(), %error, "persisted cache write failed");
                false
            }
        }
    }

    fn read(&self, slot: Slot, key: &str) -> Option<Value> {
        let storage_key = self.storage_key(slot, key);
        let raw = match self.store.get_item(&storage_key) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(key = %storage_key, %error, "persisted cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<TimedEntry<Value>>(&raw) {
            Ok(entry) if entry.is_expired(self.clock.now()) => {
                debug!(key = %storage_key, "persisted entry expired");
                self.discard(&storage_key);
                None
            }
            Ok(entry) => Some(entry.into_value()),
            Err(error) => {
                warn!(key = %storage_key, %error, "persisted entry corrupted, removing");
                self.discard(&storage_key);
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
        serde_json::from_value(value)
            .inspect_err(|error| debug!(key, %error, "persisted value has unexpected shape"))
            .ok()
    }

    fn discard(&self, storage_key: &str) -> bool {
        match self.store.remove_item(storage_key) {
            Ok(()) => true,
            Err(error) => {
                warn!(key = %storage_key, %error, "persisted cache remove failed");
                false
            }
        }
    }

    /// Stores `value` under `key` for `ttl` or the default TTL.
    ///
    /// Returns whether the write reached storage.
    pub fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.write(Slot::Primary, key, value, ttl)
    }

    /// Reads the primary slot of `key`.
    ///
    /// Expired and unreadable entries are removed and miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        Self::decode(key, self.read(Slot::Primary, key)?)
    }

    /// Removes the primary slot of `key`.
    pub fn remove(&self, key: &str) -> bool {
        self.discard(&self.storage_key(Slot::Primary, key))
    }

    fn namespaced_keys(&self, prefix: &str) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys.into_iter().filter(|key| key.starts_with(prefix)).collect(),
            Err(error) => {
                warn!(%error, "persisted cache enumeration failed");
                Vec::new()
            }
        }
    }

    /// Removes every slot in the namespace. Returns how many were removed.
    pub fn clear(&self) -> usize {
        self.namespaced_keys(&self.namespace)
            .iter()
            .filter(|key| self.discard(key))
            .count()
    }

    /// Removes expired and unreadable entries in the namespace.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let stale = self.namespaced_keys(&self.namespace).into_iter().filter(|key| {
            match self.store.get_item(key) {
                Ok(Some(raw)) => serde_json::from_str::<TimedEntry<Value>>(&raw)
                    .map_or(true, |entry| entry.is_expired(now)),
                Ok(None) => false,
                Err(error) => {
                    warn!(key = %key, %error, "persisted cache read failed");
                    false
                }
            }
        });
        let purged = stale.filter(|key| self.discard(key)).count();
        if purged > 0 {
            debug!(purged, "expired persisted entries purged");
        }
        purged
    }

    /// Removes every `offline_` slot in the namespace.
    pub fn purge_offline(&self) -> usize {
        let prefix = format!("{}{}", self.namespace, OFFLINE_TAG);
        self.namespaced_keys(&prefix)
            .iter()
            .filter(|key| self.discard(key))
            .count()
    }

    /// Writes `value` according to connectivity and `options`.
    ///
    /// While offline, network-dependent data goes to the offline slot with
    /// the extended TTL; otherwise to the primary slot. High priority data
    /// additionally gets a backup copy. The two writes are independent.
    /// Returns whether the first write reached storage.
    pub fn smart_set<T>(&self, key: &str, value: &T, options: SmartSetOptions) -> bool
    where
        T: Serialize + ?Sized,
    {
        let slot = if options.network_dependent && !self.connectivity.is_online() {
            Slot::Offline
        } else {
            Slot::Primary
        };
        let written = self.write(slot, key, value, options.ttl);
        if options.priority == Priority::High {
            self.write(Slot::Backup, key, value, options.ttl);
        }
        written
    }

    /// Reads `key` from the primary, offline (only while offline) and backup
    /// slots, in that order.
    ///
    /// A slot whose value does not decode as `T` counts as a miss.
    pub fn smart_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let offline = !self.connectivity.is_online();
        let lookup = |slot: Slot| self.read(slot, key).and_then(|value| Self::decode(key, value));
        lookup(Slot::Primary)
            .or_else(|| offline.then(|| lookup(Slot::Offline)).flatten())
            .or_else(|| lookup(Slot::Backup))
    }

    /// Connectivity came back: drops offline data and runs the refresh hook.
    pub fn handle_online(&self) -> usize {
        let purged = self.purge_offline();
        info!(purged, "connectivity regained, offline entries purged");
        self.refresh.refresh();
        purged
    }
}

impl<K> PersistentCache<K>
where
    K: KeyValueStore + 'static,
{
    /// Runs [`handle_online`](Self::handle_online) after offline → online
    /// transitions of the connectivity flag.
    ///
    /// Several transitions between two wakeups collapse into one purge.
    pub fn watch_connectivity(&self) -> TaskHandle {
        let cache = self.clone();
        let mut rx = self.connectivity.subscribe();
        let mut reconnects = rx.borrow_and_update().reconnects;
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                if state.reconnects != reconnects {
                    cache.handle_online();
                }
                reconnects = state.reconnects;
            }
        });
        TaskHandle::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use offgrid_backend::MemoryKeyValueStore;
    use offgrid_core::{ManualClock, Origin};
    use pretty_assertions::assert_eq;

    use super::*;

    fn cache(store: MemoryKeyValueStore) -> (PersistentCache<MemoryKeyValueStore>, ManualClock) {
        let clock = ManualClock::default();
        let config = PageConfig::builder(Origin::parse("https://devcommunity.cn").unwrap())
            .build()
            .unwrap();
        let cache = PersistentCache::new(store, &config, Connectivity::default())
            .with_clock(Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn entries_are_namespaced_json() {
        let store = MemoryKeyValueStore::new();
        let (cache, _) = cache(store.clone());

        assert!(cache.set("cities", &vec!["beijing", "shanghai"], None));
        let raw = store.get_item("devcommunity_cache_cities").unwrap().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["value"], serde_json::json!(["beijing", "shanghai"]));
        assert_eq!(json["ttl"], 86_400_000);

        assert_eq!(cache.get::<Vec<String>>("cities").unwrap(), vec!["beijing", "shanghai"]);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let store = MemoryKeyValueStore::new();
        let (cache, clock) = cache(store.clone());
        cache.set("k", &1, Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.get::<i32>("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn corrupted_entry_is_removed_on_read() {
        let store = MemoryKeyValueStore::new();
        store.set_item("devcommunity_cache_k", "{not json").unwrap();
        let (cache, _) = cache(store.clone());

        assert_eq!(cache.get::<i32>("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn quota_failure_degrades_to_false() {
        let (cache, _) = cache(MemoryKeyValueStore::with_quota(16));
        assert!(!cache.set("big", &"x".repeat(64), None));
        assert_eq!(cache.get::<String>("big"), None);
    }

    #[test]
    fn clear_only_touches_namespace() {
        let store = MemoryKeyValueStore::new();
        store.set_item("other_app", "keep").unwrap();
        let (cache, _) = cache(store.clone());
        cache.set("a", &1, None);
        cache.smart_set("b", &2, SmartSetOptions { priority: Priority::High, ..Default::default() });

        assert_eq!(cache.clear(), 3);
        assert_eq!(store.keys().unwrap(), vec!["other_app".to_owned()]);
    }

    #[test]
    fn offline_network_dependent_write_uses_offline_slot() {
        let store = MemoryKeyValueStore::new();
        let (cache, clock) = cache(store.clone());
        cache.connectivity().set_online(false);

        let options = SmartSetOptions {
            network_dependent: true,
            ..Default::default()
        };
        assert!(cache.smart_set("feed", &"cached", options));
        assert!(store.get_item("devcommunity_cache_feed").unwrap().is_none());
        assert!(store.get_item("devcommunity_cache_offline_feed").unwrap().is_some());

        // Offline slot lives seven times the TTL.
        clock.advance(Duration::from_secs(6 * 24 * 60 * 60));
        assert_eq!(cache.smart_get::<String>("feed").as_deref(), Some("cached"));

        // Not consulted once back online.
        cache.connectivity().set_online(true);
        assert_eq!(cache.smart_get::<String>("feed"), None);
    }

    #[test]
    fn backup_slot_outlives_primary() {
        let (cache, clock) = cache(MemoryKeyValueStore::new());
        let options = SmartSetOptions {
            ttl: Some(Duration::from_secs(60)),
            priority: Priority::High,
            network_dependent: false,
        };
        cache.smart_set("profile", &"me", options);

        clock.advance(Duration::from_secs(90));
        assert_eq!(cache.get::<String>("profile"), None);
        assert_eq!(cache.smart_get::<String>("profile").as_deref(), Some("me"));

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.smart_get::<String>("profile"), None);
    }

    #[test]
    fn misshapen_primary_falls_back_to_backup() {
        let store = MemoryKeyValueStore::new();
        let (cache, _) = cache(store.clone());
        let options = SmartSetOptions {
            priority: Priority::High,
            ..Default::default()
        };
        cache.smart_set("count", &3, options);
        cache.set("count", &"three", None);

        assert_eq!(cache.smart_get::<i32>("count"), Some(3));
    }

    #[test]
    fn purge_expired_sweeps_namespace() {
        let store = MemoryKeyValueStore::new();
        let (cache, clock) = cache(store.clone());
        cache.set("short", &1, Some(Duration::from_secs(1)));
        cache.set("long", &2, None);
        store.set_item("devcommunity_cache_broken", "][").unwrap();

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.get::<i32>("long"), Some(2));
    }

    #[derive(Default)]
    struct CountingRefresh(AtomicUsize);

    impl RefreshHook for CountingRefresh {
        fn refresh(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn regaining_connectivity_purges_offline_slots() {
        let store = MemoryKeyValueStore::new();
        let refresh = Arc::new(CountingRefresh::default());
        let (cache, _) = cache(store.clone());
        let cache = cache.with_refresh_hook(refresh.clone());
        let _watch = cache.watch_connectivity();

        cache.connectivity().set_online(false);
        tokio::task::yield_now().await;
        let options = SmartSetOptions {
            network_dependent: true,
            ..Default::default()
        };
        cache.smart_set("a", &1, options);
        cache.smart_set("b", &2, options);
        cache.set("c", &3, None);

        cache.connectivity().set_online(true);
        for _ in 0..10 {
            if refresh.0.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.keys().unwrap(), vec!["devcommunity_cache_c".to_owned()]);
    }

    #[tokio::test]
    async fn reconnect_is_seen_even_if_offline_again() {
        let store = MemoryKeyValueStore::new();
        let refresh = Arc::new(CountingRefresh::default());
        let (cache, _) = cache(store.clone());
        let cache = cache.with_refresh_hook(refresh.clone());
        cache.connectivity().set_online(false);
        let _watch = cache.watch_connectivity();

        let options = SmartSetOptions {
            network_dependent: true,
            ..Default::default()
        };
        cache.smart_set("a", &1, options);

        // Both flips land before the watcher gets to run.
        cache.connectivity().set_online(true);
        cache.connectivity().set_online(false);
        for _ in 0..10 {
            if refresh.0.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }
}

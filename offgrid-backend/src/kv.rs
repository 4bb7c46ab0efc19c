//! Durable string key/value storage.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{StorageError, StorageResult};

/// Synchronous string key/value storage, as browsers expose it to pages.
///
/// Every operation may fail: writes hit quotas, reads may hit corrupted
/// or inaccessible storage. Callers in the page layer catch these and
/// degrade to a miss.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, in no particular order.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<K> KeyValueStore for Arc<K>
where
    K: KeyValueStore + ?Sized,
{
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

/// [`KeyValueStore`] kept in process memory, with an optional byte quota.
///
/// The quota counts key and value lengths, which is how browsers account
/// for their storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    items: Arc<DashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once `quota_bytes` would be exceeded.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|item| item.key() != key)
            .map(|item| item.key().len() + item.value().len())
            .sum()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.get(key).map(|value| value.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(quota) = self.quota_bytes
            && self.used_bytes_without(key) + key.len() + value.len() > quota
        {
            return Err(StorageError::QuotaExceeded);
        }
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.iter().map(|item| item.key().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_rejects_oversized_writes() {
        let store = MemoryKeyValueStore::with_quota(16);
        store.set_item("a", "12345").unwrap();

        let error = store.set_item("b", "0123456789abcdef").unwrap_err();
        assert!(matches!(error, StorageError::QuotaExceeded));
        assert_eq!(store.get_item("b").unwrap(), None);
    }

    #[test]
    fn overwrite_does_not_double_count() {
        let store = MemoryKeyValueStore::with_quota(10);
        store.set_item("key", "1234567").unwrap();
        store.set_item("key", "7654321").unwrap();
        assert_eq!(store.get_item("key").unwrap().as_deref(), Some("7654321"));
    }
}

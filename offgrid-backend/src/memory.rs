//! In-memory [`CacheStorage`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use offgrid_core::{CacheName, Request, Response};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{CacheStorage, StorageError, StorageResult};

/// Entries of one named cache keyed by request URL, oldest write first.
type Entries = IndexMap<String, (Request, Response)>;

#[derive(Debug, Default)]
struct Inner {
    caches: RwLock<IndexMap<CacheName, Arc<RwLock<Entries>>>>,
    max_entries: Option<usize>,
}

/// Named caches held in process memory.
///
/// Mirrors the host cache storage closely enough to drive the interceptor
/// in tests and in non-browser embeddings: lazy cache creation, wholesale
/// entry replacement, insertion-ordered enumeration and atomic bulk writes.
///
/// Clones share the same caches.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use offgrid_backend::{CacheStorage, MemoryCacheStorage};
/// use offgrid_core::{CacheName, Request, Response};
///
/// let storage = MemoryCacheStorage::new();
/// let name = CacheName::from("static-v1");
/// let request = Request::parse("https://devcommunity.cn/").unwrap();
///
/// storage.put(&name, &request, Response::ok("<html>")).await.unwrap();
/// assert_eq!(storage.keys().await.unwrap(), vec![name.clone()]);
/// assert!(storage.match_in(&name, &request).await.unwrap().is_some());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    inner: Arc<Inner>,
}

impl MemoryCacheStorage {
    /// Unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose caches each refuse to grow beyond `max_entries`.
    ///
    /// Writes past the limit fail with [`StorageError::QuotaExceeded`].
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                caches: RwLock::default(),
                max_entries: Some(max_entries),
            }),
        }
    }

    async fn cache(&self, name: &CacheName) -> Option<Arc<RwLock<Entries>>> {
        self.inner.caches.read().await.get(name).cloned()
    }

    async fn cache_or_create(&self, name: &CacheName) -> Arc<RwLock<Entries>> {
        if let Some(cache) = self.cache(name).await {
            return cache;
        }
        let mut caches = self.inner.caches.write().await;
        caches.entry(name.clone()).or_default().clone()
    }

    fn check_quota(
        &self,
        name: &CacheName,
        entries: &Entries,
        incoming: &[&str],
    ) -> StorageResult<()> {
        let Some(max) = self.inner.max_entries else {
            return Ok(());
        };
        let added = incoming
            .iter()
            .filter(|key| !entries.contains_key(**key))
            .count();
        if entries.len() + added > max {
            debug!(cache = %name, len = entries.len(), added, max, "cache write over quota");
            Err(StorageError::QuotaExceeded)
        } else {
            Ok(())
        }
    }
}

fn insert(entries: &mut Entries, request: &Request, response: Response) {
    let key = request.cache_key();
    // Re-written entries move to the end of the enumeration order.
    entries.shift_remove(&key);
    entries.insert(key, (request.clone(), response));
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> StorageResult<Vec<CacheName>> {
        Ok(self.inner.caches.read().await.keys().cloned().collect())
    }

    async fn has(&self, name: &CacheName) -> StorageResult<bool> {
        Ok(self.inner.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &CacheName) -> StorageResult<bool> {
        Ok(self.inner.caches.write().await.shift_remove(name).is_some())
    }

    async fn match_in(
        &self,
        name: &CacheName,
        request: &Request,
    ) -> StorageResult<Option<Response>> {
        let Some(cache) = self.cache(name).await else {
            return Ok(None);
        };
        let entries = cache.read().await;
        Ok(entries
            .get(&request.cache_key())
            .map(|(_, response)| response.clone()))
    }

    async fn match_any(&self, request: &Request) -> StorageResult<Option<Response>> {
        let caches: Vec<_> = self.inner.caches.read().await.values().cloned().collect();
        let key = request.cache_key();
        for cache in caches {
            if let Some((_, response)) = cache.read().await.get(&key) {
                return Ok(Some(response.clone()));
            }
        }
        Ok(None)
    }

    async fn put(
        &self,
        name: &CacheName,
        request: &Request,
        response: Response,
    ) -> StorageResult<()> {
        let cache = self.cache_or_create(name).await;
        let mut entries = cache.write().await;
        self.check_quota(name, &entries, &[request.cache_key().as_str()])?;
        insert(&mut entries, request, response);
        Ok(())
    }

    async fn put_all(
        &self,
        name: &CacheName,
        batch: Vec<(Request, Response)>,
    ) -> StorageResult<()> {
        let cache = self.cache_or_create(name).await;
        let mut entries = cache.write().await;
        let keys: Vec<String> = batch.iter().map(|(request, _)| request.cache_key()).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.check_quota(name, &entries, &keys)?;
        for (request, response) in batch {
            insert(&mut entries, &request, response);
        }
        Ok(())
    }

    async fn requests(&self, name: &CacheName) -> StorageResult<Vec<Request>> {
        let Some(cache) = self.cache(name).await else {
            return Ok(Vec::new());
        };
        let entries = cache.read().await;
        Ok(entries.values().map(|(request, _)| request.clone()).collect())
    }

    async fn remove_entry(&self, name: &CacheName, request: &Request) -> StorageResult<bool> {
        let Some(cache) = self.cache(name).await else {
            return Err(StorageError::CacheNotFound(name.clone()));
        };
        let mut entries = cache.write().await;
        Ok(entries.shift_remove(&request.cache_key()).is_some())
    }

    async fn len(&self, name: &CacheName) -> StorageResult<usize> {
        match self.cache(name).await {
            Some(cache) => Ok(cache.read().await.len()),
            None => Ok(0),
        }
    }

    fn label(&self) -> &str {
        "memory"
    }
}

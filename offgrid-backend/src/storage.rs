use std::sync::Arc;

use async_trait::async_trait;
use offgrid_core::{CacheName, Request, Response};

use crate::StorageError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent, string-identified caches of request → response entries.
///
/// Caches come into existence on their first write. Writing a request that
/// is already stored replaces the entry wholesale and moves it to the end of
/// the enumeration order, so [`requests`](CacheStorage::requests) always lists
/// entries oldest-write first.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of all existing caches, in creation order.
    async fn keys(&self) -> StorageResult<Vec<CacheName>>;

    async fn has(&self, name: &CacheName) -> StorageResult<bool>;

    /// Deletes a whole cache. Returns whether it existed.
    async fn delete(&self, name: &CacheName) -> StorageResult<bool>;

    async fn match_in(&self, name: &CacheName, request: &Request)
    -> StorageResult<Option<Response>>;

    /// Looks `request` up in every cache, in creation order.
    async fn match_any(&self, request: &Request) -> StorageResult<Option<Response>>;

    async fn put(&self, name: &CacheName, request: &Request, response: Response)
    -> StorageResult<()>;

    /// Writes every entry or none of them.
    async fn put_all(
        &self,
        name: &CacheName,
        entries: Vec<(Request, Response)>,
    ) -> StorageResult<()>;

    /// Stored requests, oldest write first. Empty for a missing cache.
    async fn requests(&self, name: &CacheName) -> StorageResult<Vec<Request>>;

    /// Deletes one entry. Returns whether it existed.
    async fn remove_entry(&self, name: &CacheName, request: &Request) -> StorageResult<bool>;

    async fn len(&self, name: &CacheName) -> StorageResult<usize> {
        Ok(self.requests(name).await?.len())
    }

    /// Name of this storage for logs.
    fn label(&self) -> &str {
        "storage"
    }
}

#[async_trait]
impl<S> CacheStorage for Arc<S>
where
    S: CacheStorage + ?Sized,
{
    async fn keys(&self) -> StorageResult<Vec<CacheName>> {
        (**self).keys().await
    }

    async fn has(&self, name: &CacheName) -> StorageResult<bool> {
        (**self).has(name).await
    }

    async fn delete(&self, name: &CacheName) -> StorageResult<bool> {
        (**self).delete(name).await
    }

    async fn match_in(
        &self,
        name: &CacheName,
        request: &Request,
    ) -> StorageResult<Option<Response>> {
        (**self).match_in(name, request).await
    }

    async fn match_any(&self, request: &Request) -> StorageResult<Option<Response>> {
        (**self).match_any(request).await
    }

    async fn put(
        &self,
        name: &CacheName,
        request: &Request,
        response: Response,
    ) -> StorageResult<()> {
        (**self).put(name, request, response).await
    }

    async fn put_all(
        &self,
        name: &CacheName,
        entries: Vec<(Request, Response)>,
    ) -> StorageResult<()> {
        (**self).put_all(name, entries).await
    }

    async fn requests(&self, name: &CacheName) -> StorageResult<Vec<Request>> {
        (**self).requests(name).await
    }

    async fn remove_entry(&self, name: &CacheName, request: &Request) -> StorageResult<bool> {
        (**self).remove_entry(name, request).await
    }

    async fn len(&self, name: &CacheName) -> StorageResult<usize> {
        (**self).len(name).await
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

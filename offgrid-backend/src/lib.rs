//! Storage traits and in-memory backends for offgrid.
//!
//! Two kinds of host storage sit underneath the caching core:
//!
//! - [`CacheStorage`]: persistent named caches of request → response
//!   entries, used by the offline interceptor.
//! - [`KeyValueStore`]: durable string key/value storage, used by the
//!   in-page persisted cache.
//!
//! If you want to plug in real host storage, you are in the right place.
mod kv;
mod memory;
mod storage;

pub use kv::{KeyValueStore, MemoryKeyValueStore};
pub use memory::MemoryCacheStorage;
pub use storage::{CacheStorage, StorageResult};

use offgrid_core::CacheName;
use thiserror::Error;

/// General groups of errors in storage interaction.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The host refused the write because storage is full.
    #[error("storage quota exceeded")]
    QuotaExceeded,
    /// The named cache does not exist.
    #[error("cache `{0}` does not exist")]
    CacheNotFound(CacheName),
    /// Any other host-side failure.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

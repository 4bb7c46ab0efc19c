//! Entry-count based cache trimming.
//!
//! A cache holding more than [`TrimPolicy::max_entries`] entries loses its
//! oldest entries until [`TrimPolicy::keep_entries`] remain. Caches are
//! trimmed concurrently and a failing cache never stops the others.

use futures::future::join_all;
use offgrid_backend::{CacheStorage, StorageResult};
use offgrid_core::CacheName;
use tracing::{debug, info, warn};

use crate::config::TrimPolicy;

/// One cache that was trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTrim {
    /// Trimmed cache.
    pub cache: CacheName,
    /// Entry count before the trim.
    pub before: usize,
    /// Entries deleted.
    pub evicted: usize,
}

/// One cache whose trim failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimFailure {
    /// Failing cache.
    pub cache: CacheName,
    /// Storage error text.
    pub reason: String,
}

/// Result of trimming every cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Caches that were over the threshold and got trimmed.
    pub trimmed: Vec<CacheTrim>,
    /// Caches whose trim failed part-way or entirely.
    pub failed: Vec<TrimFailure>,
}

impl TrimReport {
    /// Total entries deleted.
    pub fn evicted(&self) -> usize {
        self.trimmed.iter().map(|trim| trim.evicted).sum()
    }
}

/// Trims every cache in `storage` according to `policy`.
///
/// Never fails: errors are logged and listed in the report.
pub async fn trim_caches<S>(storage: &S, policy: TrimPolicy) -> TrimReport
where
    S: CacheStorage + ?Sized,
{
    let names = match storage.keys().await {
        Ok(names) => names,
        Err(error) => {
            warn!(%error, backend = storage.label(), "cache enumeration failed, nothing trimmed");
            crate::metrics::record_storage_error("keys");
            return TrimReport::default();
        }
    };

    let trims = names.into_iter().map(|name| async move {
        let result = trim_cache(storage, &name, policy).await;
        (name, result)
    });

    let mut report = TrimReport::default();
    for (cache, result) in join_all(trims).await {
        match result {
            Ok(Some(trim)) => {
                crate::metrics::record_trim(trim.cache.as_str(), trim.evicted);
                report.trimmed.push(trim);
            }
            Ok(None) => {}
            Err(error) => {
                warn!(%cache, %error, "cache trim failed");
                crate::metrics::record_storage_error("trim");
                report.failed.push(TrimFailure {
                    cache,
                    reason: error.to_string(),
                });
            }
        }
    }
    report
}

async fn trim_cache<S>(
    storage: &S,
    name: &CacheName,
    policy: TrimPolicy,
) -> StorageResult<Option<CacheTrim>>
where
    S: CacheStorage + ?Sized,
{
    let requests = storage.requests(name).await?;
    let before = requests.len();
    if before <= policy.max_entries {
        debug!(cache = %name, entries = before, "cache within limit");
        return Ok(None);
    }

    let excess = before - policy.keep_entries;
    for request in &requests[..excess] {
        storage.remove_entry(name, request).await?;
    }
    info!(cache = %name, before, evicted = excess, "cache trimmed");
    Ok(Some(CacheTrim {
        cache: name.clone(),
        before,
        evicted: excess,
    }))
}

#[cfg(test)]
mod tests {
    use offgrid_backend::MemoryCacheStorage;
    use offgrid_core::{Request, Response};
    use pretty_assertions::assert_eq;

    use super::*;

    async fn fill(storage: &MemoryCacheStorage, name: &CacheName, count: usize) {
        for i in 0..count {
            let request = Request::parse(&format!("https://devcommunity.cn/api/{i}")).unwrap();
            storage.put(name, &request, Response::ok("{}")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn keeps_most_recent_fifty_of_one_hundred_one() {
        let storage = MemoryCacheStorage::new();
        let name = CacheName::from("dynamic-v1");
        fill(&storage, &name, 101).await;

        let report = trim_caches(&storage, TrimPolicy::default()).await;
        assert_eq!(report.evicted(), 51);

        let kept: Vec<_> = storage
            .requests(&name)
            .await
            .unwrap()
            .iter()
            .map(|r| r.path().to_owned())
            .collect();
        let expected: Vec<_> = (51..101).map(|i| format!("/api/{i}")).collect();
        assert_eq!(kept, expected);
    }

    #[tokio::test]
    async fn exactly_at_threshold_is_untouched() {
        let storage = MemoryCacheStorage::new();
        let name = CacheName::from("image-v1");
        fill(&storage, &name, 100).await;

        let report = trim_caches(&storage, TrimPolicy::default()).await;
        assert_eq!(report, TrimReport::default());
        assert_eq!(storage.len(&name).await.unwrap(), 100);
    }
}

//! Coalescing image validation.
//!
//! [`ImageValidator::preload`] probes each image source at most once at a
//! time. Concurrent callers for the same source share the in-flight probe
//! and observe the same outcome; later callers read the cached result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use tracing::{Instrument, debug, debug_span, trace, warn};

/// Default hard limit on one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Loads an image the way the page would and reports whether it decoded.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Loads `src`. Resolves once the load settled either way.
    async fn load(&self, src: &str) -> bool;
}

#[async_trait]
impl<P> ImageProbe for Arc<P>
where
    P: ImageProbe + ?Sized,
{
    async fn load(&self, src: &str) -> bool {
        (**self).load(src).await
    }
}

type PendingProbe = Shared<BoxFuture<'static, bool>>;

/// Validates image sources with at most one probe in flight per source.
pub struct ImageValidator<P> {
    probe: Arc<P>,
    results: Arc<DashMap<String, bool>>,
    pending: Arc<DashMap<String, PendingProbe>>,
    timeout: Duration,
}

impl<P> fmt::Debug for ImageValidator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageValidator")
            .field("results", &self.results.len())
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<P> ImageValidator<P>
where
    P: ImageProbe + 'static,
{
    /// Validator with the given probe timeout.
    pub fn new(probe: P, timeout: Duration) -> Self {
        Self {
            probe: Arc::new(probe),
            results: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Whether `src` loads.
    ///
    /// A cached result is returned immediately. Otherwise the caller joins
    /// the in-flight probe for `src` or starts one. A probe that outlives
    /// the timeout counts as failed.
    pub async fn preload(&self, src: &str) -> bool {
        if let Some(hit) = self.cached(src) {
            trace!(src, hit, "image result cached");
            return hit;
        }

        let probe = match self.pending.entry(src.to_owned()) {
            Entry::Occupied(entry) => {
                trace!(src, "joining in-flight image probe");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A probe may have finished between the first check and
                // taking the entry lock.
                if let Some(hit) = self.cached(src) {
                    return hit;
                }
                let probe = self.start_probe(src.to_owned());
                entry.insert(probe.clone());
                probe
            }
        };
        probe.await
    }

    fn start_probe(&self, src: String) -> PendingProbe {
        let probe = Arc::clone(&self.probe);
        let results = Arc::clone(&self.results);
        let pending = Arc::clone(&self.pending);
        let timeout = self.timeout;
        let span = debug_span!("image_probe", src = %src);

        // Spawned so the result is recorded even if every caller gives up.
        let task = tokio::spawn(
            async move {
                let loaded = match tokio::time::timeout(timeout, probe.load(&src)).await {
                    Ok(loaded) => loaded,
                    Err(_) => {
                        warn!(?timeout, "image probe timed out");
                        false
                    }
                };
                debug!(loaded, "image probed");
                results.insert(src.clone(), loaded);
                pending.remove(&src);
                loaded
            }
            .instrument(span),
        );
        async move { task.await.unwrap_or(false) }.boxed().shared()
    }

    /// Probes every source concurrently. Failures never abort the batch.
    pub async fn preload_batch<I, S>(&self, sources: I) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let probes = sources.into_iter().map(Into::into).map(|src: String| async move {
            let loaded = self.preload(&src).await;
            (src, loaded)
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Result of an earlier probe of `src`.
    pub fn cached(&self, src: &str) -> Option<bool> {
        self.results.get(src).map(|hit| *hit)
    }

    /// Number of probes in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Forgets every cached result.
    pub fn clear(&self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    struct SlowProbe {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl SlowProbe {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl ImageProbe for SlowProbe {
        async fn load(&self, src: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            !src.contains("missing")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_probe() {
        let probe = Arc::new(SlowProbe::new(Duration::from_millis(300)));
        let validator = ImageValidator::new(probe.clone(), DEFAULT_PROBE_TIMEOUT);

        let results = join_all((0..5).map(|_| validator.preload("/images/cities/beijing.webp"))).await;

        assert_eq!(results, vec![true; 5]);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(validator.in_flight(), 0);

        assert!(validator.preload("/images/cities/beijing.webp").await);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let probe = Arc::new(SlowProbe::new(Duration::from_secs(10)));
        let validator = ImageValidator::new(probe.clone(), DEFAULT_PROBE_TIMEOUT);

        let start = tokio::time::Instant::now();
        assert!(!validator.preload("/images/hero-bg.webp").await);
        assert!(start.elapsed() >= DEFAULT_PROBE_TIMEOUT);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(validator.cached("/images/hero-bg.webp"), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_settles_every_source() {
        let probe = Arc::new(SlowProbe::new(Duration::from_millis(10)));
        let validator = ImageValidator::new(probe.clone(), DEFAULT_PROBE_TIMEOUT);

        let results = validator
            .preload_batch(["/images/a.webp", "/images/missing.webp", "/images/a.webp"])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["/images/a.webp"], true);
        assert_eq!(results["/images/missing.webp"], false);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

        validator.clear();
        assert_eq!(validator.cached("/images/a.webp"), None);
    }
}

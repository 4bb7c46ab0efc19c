//! Metrics declaration and recording.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::RequestClass;
use crate::context::ResponseSource;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track intercepted fetches by class and response source.
    pub static ref FETCH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "offgrid_fetch_total",
            "Total number of intercepted fetches."
        );
        "offgrid_fetch_total"
    };
    /// Track fetches answered without the network.
    pub static ref FETCH_FALLBACK_COUNTER: &'static str = {
        metrics::describe_counter!(
            "offgrid_fetch_fallback_total",
            "Total number of fetches answered by an offline fallback."
        );
        "offgrid_fetch_fallback_total"
    };
    /// Track entries evicted by cache trims.
    pub static ref TRIM_EVICTIONS: &'static str = {
        metrics::describe_counter!(
            "offgrid_trim_evictions_total",
            "Total number of cache entries evicted by trims."
        );
        "offgrid_trim_evictions_total"
    };
    /// Track failed installs.
    pub static ref INSTALL_FAILURES: &'static str = {
        metrics::describe_counter!(
            "offgrid_install_failures_total",
            "Total number of failed install phases."
        );
        "offgrid_install_failures_total"
    };
    /// Track cache storage errors per operation.
    pub static ref STORAGE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "offgrid_storage_errors_total",
            "Total number of cache storage errors swallowed by the interceptor."
        );
        "offgrid_storage_errors_total"
    };
}

/// Record one answered fetch.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fetch(class: RequestClass, source: &ResponseSource) {
    metrics::counter!(
        *FETCH_COUNTER,
        "class" => class.as_str(),
        "source" => source.as_str()
    )
    .increment(1);
    if source.is_fallback() {
        metrics::counter!(*FETCH_FALLBACK_COUNTER, "class" => class.as_str()).increment(1);
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch(_class: RequestClass, _source: &ResponseSource) {}

/// Record entries evicted from one cache.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_trim(cache: &str, evicted: usize) {
    metrics::counter!(*TRIM_EVICTIONS, "cache" => cache.to_owned()).increment(evicted as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_trim(_cache: &str, _evicted: usize) {}

/// Record a failed install.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_install_failure() {
    metrics::counter!(*INSTALL_FAILURES).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_install_failure() {}

/// Record a swallowed storage error.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_storage_error(operation: &'static str) {
    metrics::counter!(*STORAGE_ERRORS, "operation" => operation).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_storage_error(_operation: &'static str) {}

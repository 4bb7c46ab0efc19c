//! Results of intercepted fetches.

use offgrid_core::{CacheKind, Response};

use crate::RequestClass;

/// Where an answered response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSource {
    /// A stored entry of the given cache.
    Cache(CacheKind),
    /// A live network response.
    Network,
    /// The cached offline page.
    OfflinePage,
    /// The cached site root.
    Root,
    /// A placeholder generated locally.
    Synthesized,
}

impl ResponseSource {
    /// Returns the source as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache(CacheKind::Static) => "cache_static",
            ResponseSource::Cache(CacheKind::Dynamic) => "cache_dynamic",
            ResponseSource::Cache(CacheKind::Image) => "cache_image",
            ResponseSource::Network => "network",
            ResponseSource::OfflinePage => "offline_page",
            ResponseSource::Root => "root",
            ResponseSource::Synthesized => "synthesized",
        }
    }

    /// Whether the response stands in for unreachable content.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            ResponseSource::OfflinePage | ResponseSource::Root | ResponseSource::Synthesized
        )
    }
}

/// Why a fetch was left to the host's default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// The request targets another origin.
    CrossOrigin,
    /// The request is not a `GET`; named caches only hold `GET` entries.
    Method,
    /// This version is not active yet.
    NotActive,
}

/// Result of intercepting one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host fetches as if no interceptor existed.
    Passthrough(PassthroughReason),
    /// Answered by the interceptor.
    Answered {
        /// Class that picked the strategy.
        class: RequestClass,
        /// Where the response came from.
        source: ResponseSource,
        /// The response handed to the page.
        response: Response,
    },
}

impl FetchOutcome {
    /// The answered response, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Answered { response, .. } => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }

    /// The response source, if answered.
    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Answered { source, .. } => Some(*source),
            FetchOutcome::Passthrough(_) => None,
        }
    }

    /// Consumes the outcome and returns the answered response.
    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Answered { response, .. } => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }
}

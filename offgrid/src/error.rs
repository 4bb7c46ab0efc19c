use http::StatusCode;
use http::uri::InvalidUri;
use offgrid_backend::StorageError;
use offgrid_core::NetworkError;
use thiserror::Error;

use crate::lifecycle::{LifecycleEvent, LifecycleState};

/// Errors surfaced by the interceptor.
///
/// Fetches never fail: network and storage trouble resolves to a fallback
/// response. Only lifecycle misuse and install failures reach the caller.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// The event is not valid in the current lifecycle state.
    #[error("cannot handle {event} while {from}")]
    InvalidTransition {
        /// State the worker was in.
        from: LifecycleState,
        /// Rejected event.
        event: LifecycleEvent,
    },
    /// A manifest URL could not be fetched during install.
    #[error("manifest entry {url} could not be fetched: {source}")]
    ManifestFetch {
        /// Failing URL.
        url: String,
        /// Network error.
        #[source]
        source: NetworkError,
    },
    /// A manifest URL answered with a non-2xx status during install.
    #[error("manifest entry {url} answered {status}")]
    ManifestStatus {
        /// Failing URL.
        url: String,
        /// Returned status.
        status: StatusCode,
    },
    /// The manifest could not be written to storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A configured path does not form a valid URL.
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUri),
}

//! The network as seen from the interceptor.
//!
//! [`Network`] is the upstream every cache miss falls through to. The
//! interceptor never lets a [`NetworkError`] reach the page: each strategy
//! turns it into a cached fallback or a synthesized placeholder.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Request, Response};

/// A failed fetch. Non-2xx responses are *not* errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No connectivity.
    #[error("network is unreachable")]
    Offline,
    /// The host gave up waiting.
    #[error("request timed out")]
    Timeout,
    /// Any other transport failure.
    #[error("fetch failed: {0}")]
    Other(String),
}

/// Performs real network fetches.
///
/// # Examples
///
/// ```rust,ignore
/// use offgrid_core::{Network, NetworkError, Request, Response};
///
/// struct AlwaysOffline;
///
/// #[async_trait::async_trait]
/// impl Network for AlwaysOffline {
///     async fn fetch(&self, _request: &Request) -> Result<Response, NetworkError> {
///         Err(NetworkError::Offline)
///     }
/// }
/// ```
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetches `request` from the network.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[async_trait]
impl<N> Network for Arc<N>
where
    N: Network + ?Sized,
{
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<N> Network for &N
where
    N: Network + ?Sized,
{
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request).await
    }
}

//! Fetch strategies.
//!
//! | Class           | Strategy      | Cache     | Offline fallback                               |
//! |-----------------|---------------|-----------|------------------------------------------------|
//! | Image           | cache-first   | `image`   | 404 `Image not available`                      |
//! | Static          | cache-first   | `static`  | offline page / 503 for navigations, else 404   |
//! | Dynamic         | network-first | `dynamic` | cached entry, then root / 503 or 404           |
//! | Default         | network only  | none      | root / 503 for navigations, else 404           |
//!
//! Storage failures never surface: a failed read is a miss and a failed
//! write is skipped.

use http::StatusCode;
use offgrid_backend::CacheStorage;
use offgrid_core::{CacheKind, Network, Request, Response};
use tracing::{debug, warn};

use crate::Interceptor;
use crate::context::ResponseSource;
use crate::host::Host;

const IMAGE_NOT_AVAILABLE: &str = "Image not available";
const RESOURCE_NOT_AVAILABLE: &str = "Resource not available";
const CONTENT_NOT_AVAILABLE: &str = "Content not available";
const REQUEST_FAILED: &str = "Request failed";
const OFFLINE: &str = "Offline";

type Answer = (Response, ResponseSource);

fn not_found(text: &'static str) -> Answer {
    (
        Response::synthesized(StatusCode::NOT_FOUND, text),
        ResponseSource::Synthesized,
    )
}

fn offline() -> Answer {
    (
        Response::synthesized(StatusCode::SERVICE_UNAVAILABLE, OFFLINE),
        ResponseSource::Synthesized,
    )
}

impl<S, N, H> Interceptor<S, N, H>
where
    S: CacheStorage,
    N: Network,
    H: Host,
{
    /// Serves from the `kind` cache, falling back to the network.
    pub(crate) async fn cache_first(&self, request: &Request, kind: CacheKind) -> Answer {
        if let Some(response) = self.lookup(kind, request).await {
            return (response, ResponseSource::Cache(kind));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(kind, request, response.clone()).await;
                }
                (response, ResponseSource::Network)
            }
            Err(error) => {
                debug!(%error, "network failed on cache miss");
                match kind {
                    CacheKind::Image => not_found(IMAGE_NOT_AVAILABLE),
                    _ if request.is_navigation() => self.offline_page().await,
                    _ => not_found(RESOURCE_NOT_AVAILABLE),
                }
            }
        }
    }

    /// Serves from the network, refreshing the `dynamic` cache, and falls
    /// back to it when the network fails.
    pub(crate) async fn network_first(&self, request: &Request) -> Answer {
        let error = match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(CacheKind::Dynamic, request, response.clone())
                        .await;
                }
                return (response, ResponseSource::Network);
            }
            Err(error) => error,
        };

        debug!(%error, "network failed, trying dynamic cache");
        if let Some(response) = self.lookup(CacheKind::Dynamic, request).await {
            return (response, ResponseSource::Cache(CacheKind::Dynamic));
        }
        if request.is_navigation() {
            self.root_page().await
        } else {
            not_found(CONTENT_NOT_AVAILABLE)
        }
    }

    /// Serves from the network without caching.
    pub(crate) async fn network_only(&self, request: &Request) -> Answer {
        match self.network.fetch(request).await {
            Ok(response) => (response, ResponseSource::Network),
            Err(error) => {
                debug!(%error, "network failed");
                if request.is_navigation() {
                    self.root_page().await
                } else {
                    not_found(REQUEST_FAILED)
                }
            }
        }
    }

    async fn lookup(&self, kind: CacheKind, request: &Request) -> Option<Response> {
        let cache = self.cache_name(kind);
        match self.storage.match_in(cache, request).await {
            Ok(found) => found,
            Err(error) => {
                warn!(%cache, %error, backend = self.storage.label(), "cache read failed, treating as miss");
                crate::metrics::record_storage_error("match");
                None
            }
        }
    }

    async fn store(&self, kind: CacheKind, request: &Request, response: Response) {
        let cache = self.cache_name(kind);
        if let Err(error) = self.storage.put(cache, request, response).await {
            warn!(%cache, %error, backend = self.storage.label(), "cache write failed, response not stored");
            crate::metrics::record_storage_error("put");
        }
    }

    /// Looks a site path up across every cache.
    async fn lookup_page(&self, path: &str) -> Option<Response> {
        let uri = match self.config().origin.join(path) {
            Ok(uri) => uri,
            Err(error) => {
                warn!(path, %error, "fallback page path is not a valid URL");
                return None;
            }
        };
        match self.storage.match_any(&Request::navigate(uri)).await {
            Ok(found) => found,
            Err(error) => {
                warn!(path, %error, "fallback page lookup failed");
                crate::metrics::record_storage_error("match_any");
                None
            }
        }
    }

    async fn offline_page(&self) -> Answer {
        match self.lookup_page(&self.config().offline_page).await {
            Some(response) => (response, ResponseSource::OfflinePage),
            None => offline(),
        }
    }

    async fn root_page(&self) -> Answer {
        match self.lookup_page(&self.config().root_page).await {
            Some(response) => (response, ResponseSource::Root),
            None => offline(),
        }
    }
}

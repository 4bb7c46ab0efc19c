//! The offline request interceptor.

use std::sync::Arc;

use futures::future::join_all;
use http::Method;
use http::uri::InvalidUri;
use offgrid_backend::CacheStorage;
use offgrid_core::{CacheKind, CacheName, Network, Request};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::classify::RequestClass;
use crate::config::InterceptorConfig;
use crate::context::{FetchOutcome, PassthroughReason};
use crate::error::InterceptError;
use crate::event::{Event, Outcome};
use crate::host::Host;
use crate::lifecycle::{Lifecycle, LifecycleEvent, LifecycleState};
use crate::message::ControlMessage;
use crate::push::{ClickOutcome, Notification, NotificationClick, PushPayload};
use crate::trim::{TrimReport, trim_caches};

/// One worker version: its caches, its lifecycle and its event handlers.
///
/// The interceptor is driven through [`dispatch`](Interceptor::dispatch) or
/// the per-event methods it forwards to. Handlers take `&self`, so any
/// number of fetches may be in flight at once.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use async_trait::async_trait;
/// use offgrid::{Event, Interceptor, Outcome, config::InterceptorConfig};
/// use offgrid::host::{Host, HostError};
/// use offgrid::push::Notification;
/// use offgrid_backend::MemoryCacheStorage;
/// use offgrid_core::{Network, NetworkError, Origin, Request, Response};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Network for Echo {
///     async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
///         Ok(Response::ok(request.path().to_owned()))
///     }
/// }
///
/// struct Headless;
///
/// #[async_trait]
/// impl Host for Headless {
///     async fn skip_waiting(&self) -> Result<(), HostError> { Ok(()) }
///     async fn claim_clients(&self) -> Result<(), HostError> { Ok(()) }
///     async fn show_notification(&self, _: &Notification) -> Result<(), HostError> { Ok(()) }
///     async fn close_notification(&self, _: &Notification) -> Result<(), HostError> { Ok(()) }
///     async fn focus_window(&self, _: &http::Uri) -> Result<bool, HostError> { Ok(false) }
///     async fn open_window(&self, _: &http::Uri) -> Result<(), HostError> { Ok(()) }
/// }
///
/// let origin = Origin::parse("https://devcommunity.cn").unwrap();
/// let config = InterceptorConfig::builder(origin.clone()).build().unwrap();
/// let interceptor = Interceptor::new(config, MemoryCacheStorage::new(), Echo, Headless);
///
/// assert_eq!(interceptor.dispatch(Event::Install).await.unwrap(), Outcome::Installed);
/// interceptor.dispatch(Event::Activate).await.unwrap();
///
/// let request = Request::get(origin.join("/favicon.svg").unwrap());
/// let outcome = interceptor.fetch(&request).await;
/// assert_eq!(outcome.response().unwrap().text(), "/favicon.svg");
/// # }
/// ```
pub struct Interceptor<S, N, H> {
    config: Arc<InterceptorConfig>,
    pub(crate) storage: S,
    pub(crate) network: N,
    host: H,
    lifecycle: Lifecycle,
}

impl<S, N, H> std::fmt::Debug for Interceptor<S, N, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle.current())
            .finish_non_exhaustive()
    }
}

impl<S, N, H> Interceptor<S, N, H>
where
    S: CacheStorage,
    N: Network,
    H: Host,
{
    /// Creates a freshly registered worker in [`LifecycleState::Parsed`].
    pub fn new(config: InterceptorConfig, storage: S, network: N, host: H) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            network,
            host,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    /// The configuration this worker runs with.
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// The underlying cache storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn cache_name(&self, kind: CacheKind) -> &CacheName {
        self.config.cache_names.get(kind)
    }

    /// Single entry point for every host event.
    ///
    /// Only lifecycle misuse and install failure produce an error.
    pub async fn dispatch(&self, event: Event) -> Result<Outcome, InterceptError> {
        let span = info_span!("dispatch", event = event.name(), state = %self.state());
        async move {
            match event {
                Event::Install => self.install().await.map(|()| Outcome::Installed),
                Event::Activate => self
                    .activate()
                    .await
                    .map(|deleted| Outcome::Activated { deleted }),
                Event::Fetch(request) => Ok(Outcome::Fetch(self.fetch(&request).await)),
                Event::Message(message) => Ok(match self.message(message).await {
                    Some(report) => Outcome::Trimmed(report),
                    None => Outcome::Ignored,
                }),
                Event::Sync { tag } => Ok(self.sync(&tag)),
                Event::Push(data) => Ok(match self.push(data.as_deref()).await {
                    Some(notification) => Outcome::NotificationShown(notification),
                    None => Outcome::Ignored,
                }),
                Event::NotificationClick(click) => Ok(Outcome::NotificationClicked(
                    self.notification_click(click).await,
                )),
                Event::Error { message } => {
                    error!(%message, "uncaught error in worker");
                    Ok(Outcome::Logged)
                }
                Event::UnhandledRejection { reason } => {
                    error!(%reason, "unhandled rejection in worker");
                    Ok(Outcome::Logged)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Stores the install manifest and asks the host to skip waiting.
    ///
    /// The manifest is all-or-nothing: one failed or non-2xx fetch leaves the
    /// `static` cache untouched and the worker [`Redundant`](LifecycleState::Redundant).
    #[instrument(skip(self), fields(cache = %self.cache_name(CacheKind::Static)))]
    pub async fn install(&self) -> Result<(), InterceptError> {
        self.lifecycle
            .begin(LifecycleEvent::Install)
            .map_err(|from| InterceptError::InvalidTransition {
                from,
                event: LifecycleEvent::Install,
            })?;

        let (precached, skipped) = futures::join!(self.precache(), self.host.skip_waiting());
        if let Err(error) = skipped {
            warn!(%error, "skip waiting refused");
        }

        match precached {
            Ok(entries) => {
                self.lifecycle.finish(LifecycleState::Installed);
                info!(entries, "installed");
                Ok(())
            }
            Err(error) => {
                self.lifecycle.finish(LifecycleState::Redundant);
                crate::metrics::record_install_failure();
                error!(%error, "install failed");
                Err(error)
            }
        }
    }

    async fn precache(&self) -> Result<usize, InterceptError> {
        let requests = self
            .config
            .manifest
            .iter()
            .map(|path| self.config.origin.join(path).map(Request::get))
            .collect::<Result<Vec<_>, InvalidUri>>()?;

        let fetches = requests.into_iter().map(|request| async move {
            let url = request.uri().to_string();
            match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => Ok((request, response)),
                Ok(response) => Err(InterceptError::ManifestStatus {
                    url,
                    status: response.status(),
                }),
                Err(source) => Err(InterceptError::ManifestFetch { url, source }),
            }
        });
        let entries = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let count = entries.len();
        self.storage
            .put_all(self.cache_name(CacheKind::Static), entries)
            .await?;
        Ok(count)
    }

    /// Deletes every cache that is not current and claims open pages.
    ///
    /// Returns the deleted cache names.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<Vec<CacheName>, InterceptError> {
        self.lifecycle
            .begin(LifecycleEvent::Activate)
            .map_err(|from| InterceptError::InvalidTransition {
                from,
                event: LifecycleEvent::Activate,
            })?;

        let (deleted, claimed) =
            futures::join!(self.delete_stale_caches(), self.host.claim_clients());
        if let Err(error) = claimed {
            warn!(%error, "claiming clients failed");
        }

        self.lifecycle.finish(LifecycleState::Activated);
        info!(deleted = deleted.len(), "activated");
        Ok(deleted)
    }

    async fn delete_stale_caches(&self) -> Vec<CacheName> {
        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(error) => {
                warn!(%error, "cache enumeration failed, stale caches kept");
                crate::metrics::record_storage_error("keys");
                return Vec::new();
            }
        };

        let deletions = names
            .into_iter()
            .filter(|name| !self.config.cache_names.is_current(name))
            .map(|name| async move {
                match self.storage.delete(&name).await {
                    Ok(true) => {
                        debug!(cache = %name, "stale cache deleted");
                        Some(name)
                    }
                    Ok(false) => None,
                    Err(error) => {
                        warn!(cache = %name, %error, "stale cache deletion failed");
                        crate::metrics::record_storage_error("delete");
                        None
                    }
                }
            });
        join_all(deletions).await.into_iter().flatten().collect()
    }

    /// Answers one request according to its class.
    ///
    /// Never fails: the worst case is a synthesized 404 or 503.
    #[instrument(skip(self, request), fields(url = %request.uri(), class = tracing::field::Empty))]
    pub async fn fetch(&self, request: &Request) -> FetchOutcome {
        if self.state() != LifecycleState::Activated {
            debug!(state = %self.state(), "not active, passing through");
            return FetchOutcome::Passthrough(PassthroughReason::NotActive);
        }

        let class = RequestClass::of(request, &self.config);
        tracing::Span::current().record("class", class.as_str());
        if class == RequestClass::CrossOrigin {
            return FetchOutcome::Passthrough(PassthroughReason::CrossOrigin);
        }
        if request.method() != Method::GET {
            debug!(method = %request.method(), "not a GET, passing through");
            return FetchOutcome::Passthrough(PassthroughReason::Method);
        }

        let (response, source) = match class {
            RequestClass::Image => self.cache_first(request, CacheKind::Image).await,
            RequestClass::Static => self.cache_first(request, CacheKind::Static).await,
            RequestClass::Dynamic => self.network_first(request).await,
            RequestClass::Default | RequestClass::CrossOrigin => {
                self.network_only(request).await
            }
        };

        crate::metrics::record_fetch(class, &source);
        debug!(source = source.as_str(), status = %response.status(), "answered");
        FetchOutcome::Answered {
            class,
            source,
            response,
        }
    }

    /// Handles a control message. Returns the trim report for `CLEAN_CACHE`.
    #[instrument(skip(self))]
    pub async fn message(&self, message: ControlMessage) -> Option<TrimReport> {
        if self.state() != LifecycleState::Activated {
            debug!("not active, message ignored");
            return None;
        }
        match message {
            ControlMessage::CleanCache => {
                Some(trim_caches(&self.storage, self.config.trim).await)
            }
            ControlMessage::Unknown => {
                debug!("unknown control message ignored");
                None
            }
        }
    }

    /// Acknowledges a background sync. No deferred work is queued.
    pub fn sync(&self, tag: &str) -> Outcome {
        info!(tag, "background sync acknowledged");
        Outcome::SyncAcknowledged
    }

    /// Shows the notification described by a push body.
    ///
    /// Empty, malformed or undeliverable pushes are skipped.
    #[instrument(skip(self, data), fields(bytes = data.map(<[u8]>::len)))]
    pub async fn push(&self, data: Option<&[u8]>) -> Option<Notification> {
        if self.state() != LifecycleState::Activated {
            debug!("not active, push ignored");
            return None;
        }
        let Some(data) = data else {
            debug!("push without payload ignored");
            return None;
        };
        let payload = match PushPayload::from_slice(data) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "malformed push payload, notification skipped");
                return None;
            }
        };

        let notification = Notification::from_payload(payload, &self.config.notification);
        match self.host.show_notification(&notification).await {
            Ok(()) => Some(notification),
            Err(error) => {
                warn!(%error, "notification could not be shown");
                None
            }
        }
    }

    /// Closes the clicked notification and follows its `open` action.
    #[instrument(skip(self, click), fields(action = click.action.as_deref()))]
    pub async fn notification_click(&self, click: NotificationClick) -> ClickOutcome {
        if let Err(error) = self.host.close_notification(&click.notification).await {
            warn!(%error, "closing notification failed");
        }
        if !click.wants_open() {
            return ClickOutcome::Dismissed;
        }

        let url = match click.notification.target(&self.config.origin) {
            Ok(url) => url,
            Err(error) => {
                warn!(%error, url = %click.notification.url, "notification url is invalid");
                return ClickOutcome::Dismissed;
            }
        };

        match self.host.focus_window(&url).await {
            Ok(true) => return ClickOutcome::Focused(url),
            Ok(false) => {}
            Err(error) => warn!(%error, "focusing window failed, opening a new one"),
        }
        match self.host.open_window(&url).await {
            Ok(()) => ClickOutcome::Opened(url),
            Err(error) => {
                warn!(%error, "opening window failed");
                ClickOutcome::Dismissed
            }
        }
    }
}

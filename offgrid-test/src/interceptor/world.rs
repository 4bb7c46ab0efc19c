use std::sync::Arc;

use anyhow::{Error, anyhow};
use cucumber::World;
use offgrid::config::InterceptorConfig;
use offgrid::push::{ClickOutcome, Notification};
use offgrid::{Event, FetchOutcome, Interceptor, Outcome, TrimReport};
use offgrid_backend::{CacheStorage, MemoryCacheStorage};
use offgrid_core::{CacheKind, CacheName, Origin, Request, Response};
use tracing::instrument::WithSubscriber;

use crate::mock::{MockHost, MockNetwork};
use crate::tracing::{SpanCollector, create_span_collector};

pub const ORIGIN: &str = "https://devcommunity.cn";

pub type TestInterceptor = Interceptor<MemoryCacheStorage, Arc<MockNetwork>, Arc<MockHost>>;

pub fn parse_kind(kind: &str) -> Result<CacheKind, Error> {
    match kind {
        "static" => Ok(CacheKind::Static),
        "dynamic" => Ok(CacheKind::Dynamic),
        "image" => Ok(CacheKind::Image),
        _ => Err(anyhow!("unknown cache kind: {kind}")),
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct InterceptorWorld {
    pub origin: Origin,
    pub version: String,
    pub manifest: Option<Vec<String>>,
    pub storage: MemoryCacheStorage,
    pub network: Arc<MockNetwork>,
    pub host: Arc<MockHost>,
    interceptor: Option<TestInterceptor>,
    pub last_fetch: Option<FetchOutcome>,
    pub last_error: Option<String>,
    pub last_trim: Option<TrimReport>,
    pub last_notification: Option<Notification>,
    pub last_click: Option<ClickOutcome>,
    pub spans: SpanCollector,
}

impl InterceptorWorld {
    pub fn new() -> Self {
        Self {
            origin: Origin::parse(ORIGIN).unwrap(),
            version: "v1".to_owned(),
            manifest: None,
            storage: MemoryCacheStorage::new(),
            network: Arc::new(MockNetwork::default()),
            host: Arc::new(MockHost::default()),
            interceptor: None,
            last_fetch: None,
            last_error: None,
            last_trim: None,
            last_notification: None,
            last_click: None,
            spans: create_span_collector(),
        }
    }

    /// The interceptor, built from the configured version on first use.
    pub fn interceptor(&mut self) -> &TestInterceptor {
        let origin = self.origin.clone();
        let version = self.version.clone();
        let manifest = self.manifest.clone();
        let storage = self.storage.clone();
        let network = self.network.clone();
        let host = self.host.clone();
        self.interceptor.get_or_insert_with(|| {
            let mut builder = InterceptorConfig::builder(origin).version(version);
            if let Some(manifest) = manifest {
                builder = builder.manifest(manifest);
            }
            let config = builder.build().expect("scenario configuration is valid");
            Interceptor::new(config, storage, network, host)
        })
    }

    pub fn cache_name(&mut self, kind: CacheKind) -> CacheName {
        self.interceptor().config().cache_names.get(kind).clone()
    }

    pub fn request(&self, path: &str) -> Request {
        Request::get(self.origin.join(path).unwrap())
    }

    /// Dispatches `event` with span capture, remembering what came back.
    pub async fn dispatch(&mut self, event: Event) -> Result<(), Error> {
        let dispatch = self.spans.dispatch().clone();
        let interceptor = self.interceptor();
        let result = interceptor
            .dispatch(event)
            .with_subscriber(dispatch)
            .await;
        match result {
            Ok(Outcome::Fetch(outcome)) => self.last_fetch = Some(outcome),
            Ok(Outcome::Trimmed(report)) => self.last_trim = Some(report),
            Ok(Outcome::NotificationShown(notification)) => {
                self.last_notification = Some(notification)
            }
            Ok(Outcome::NotificationClicked(click)) => self.last_click = Some(click),
            Ok(_) => {}
            Err(error) => self.last_error = Some(error.to_string()),
        }
        Ok(())
    }

    /// Installs and activates, then forgets the install traffic.
    pub async fn activate(&mut self) -> Result<(), Error> {
        self.interceptor().dispatch(Event::Install).await?;
        self.interceptor().dispatch(Event::Activate).await?;
        self.network.reset_calls();
        Ok(())
    }

    pub async fn fill(&self, name: &CacheName, count: usize) -> Result<(), Error> {
        for i in 0..count {
            let request = self.request(&format!("/api/items/{i}"));
            self.storage
                .put(name, &request, Response::ok(format!("item {i}")))
                .await?;
        }
        Ok(())
    }

    pub fn fetched(&self) -> Result<&FetchOutcome, Error> {
        self.last_fetch
            .as_ref()
            .ok_or_else(|| anyhow!("no fetch was dispatched"))
    }
}

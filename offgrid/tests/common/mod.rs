#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use http::{StatusCode, Uri};
use offgrid::config::InterceptorConfig;
use offgrid::host::{Host, HostError};
use offgrid::push::Notification;
use offgrid::{Event, Interceptor};
use offgrid_backend::MemoryCacheStorage;
use offgrid_core::{Network, NetworkError, Origin, Request, Response};

pub const ORIGIN: &str = "https://devcommunity.cn";

pub fn origin() -> Origin {
    Origin::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Uri {
    origin().join(path).unwrap()
}

/// Network answering `200 <path>` unless told otherwise.
#[derive(Default)]
pub struct ScriptedNetwork {
    offline: Mutex<bool>,
    statuses: Mutex<HashMap<String, StatusCode>>,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn respond_with(&self, path: &str, status: StatusCode) {
        self.statuses.lock().unwrap().insert(path.to_owned(), status);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.offline.lock().unwrap() {
            return Err(NetworkError::Offline);
        }
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(request.path())
            .copied()
            .unwrap_or(StatusCode::OK);
        Ok(Response::new(
            status,
            Default::default(),
            format!("network {}", request.path()),
        ))
    }
}

/// Host recording every call.
#[derive(Default)]
pub struct RecordingHost {
    pub skipped_waiting: AtomicUsize,
    pub claims: AtomicUsize,
    pub shown: Mutex<Vec<Notification>>,
    pub closed: Mutex<Vec<Notification>>,
    pub open_windows: Mutex<Vec<Uri>>,
    pub opened: Mutex<Vec<Uri>>,
    pub focused: Mutex<Vec<Uri>>,
}

#[async_trait]
impl Host for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), HostError> {
        self.skipped_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, notification: &Notification) -> Result<(), HostError> {
        self.closed.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn focus_window(&self, url: &Uri) -> Result<bool, HostError> {
        let open = self.open_windows.lock().unwrap().contains(url);
        if open {
            self.focused.lock().unwrap().push(url.clone());
        }
        Ok(open)
    }

    async fn open_window(&self, url: &Uri) -> Result<(), HostError> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }
}

pub type TestInterceptor =
    Interceptor<MemoryCacheStorage, std::sync::Arc<ScriptedNetwork>, std::sync::Arc<RecordingHost>>;

pub struct Fixture {
    pub interceptor: TestInterceptor,
    pub storage: MemoryCacheStorage,
    pub network: std::sync::Arc<ScriptedNetwork>,
    pub host: std::sync::Arc<RecordingHost>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(InterceptorConfig::builder(origin()).build().unwrap())
    }

    pub fn with_config(config: InterceptorConfig) -> Self {
        let storage = MemoryCacheStorage::new();
        let network = std::sync::Arc::new(ScriptedNetwork::default());
        let host = std::sync::Arc::new(RecordingHost::default());
        let interceptor = Interceptor::new(config, storage.clone(), network.clone(), host.clone());
        Self {
            interceptor,
            storage,
            network,
            host,
        }
    }

    /// Installs and activates, then forgets the install traffic.
    pub async fn activated() -> Self {
        let fixture = Self::new();
        fixture.interceptor.dispatch(Event::Install).await.unwrap();
        fixture.interceptor.dispatch(Event::Activate).await.unwrap();
        fixture.network.reset_calls();
        fixture
    }
}

//! Scriptable stand-ins for the host facilities.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::{StatusCode, Uri};
use offgrid::host::{Host, HostError};
use offgrid::push::Notification;
use offgrid_core::{Network, NetworkError, Request, Response};
use offgrid_page::{ImageProbe, PreloadDirective, PreloadSink};

/// Network answering `200 network <path>` unless scripted otherwise.
#[derive(Debug, Default)]
pub struct MockNetwork {
    offline: AtomicBool,
    statuses: Mutex<HashMap<String, StatusCode>>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn respond_with(&self, path: &str, status: StatusCode) {
        self.statuses
            .lock()
            .unwrap()
            .insert(path.to_owned(), status);
    }

    /// Number of fetches seen since the last reset.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches of `path` since the last reset.
    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| *called == path)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.lock().unwrap().push(request.path().to_owned());
        if self.offline.load(Ordering::SeqCst) {
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

/// Host recording every call it receives.
#[derive(Debug, Default)]
pub struct MockHost {
    pub skipped_waiting: AtomicUsize,
    pub claims: AtomicUsize,
    pub refuse_skip_waiting: AtomicBool,
    pub shown: Mutex<Vec<Notification>>,
    pub closed: Mutex<Vec<Notification>>,
    pub open_windows: Mutex<Vec<Uri>>,
    pub opened: Mutex<Vec<Uri>>,
    pub focused: Mutex<Vec<Uri>>,
}

#[async_trait]
impl Host for MockHost {
    async fn skip_waiting(&self) -> Result<(), HostError> {
        self.skipped_waiting.fetch_add(1, Ordering::SeqCst);
        if self.refuse_skip_waiting.load(Ordering::SeqCst) {
            return Err(HostError::new("skip_waiting", "refused by host"));
        }
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
        self.open_windows.lock().unwrap().push(url.clone());
        Ok(())
    }
}

/// Image loader with a fixed delay and a set of broken sources.
#[derive(Debug)]
pub struct MockProbe {
    delay: Mutex<Duration>,
    broken: Mutex<HashSet<String>>,
    loads: AtomicUsize,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self {
            delay: Mutex::new(Duration::from_millis(50)),
            broken: Mutex::default(),
            loads: AtomicUsize::new(0),
        }
    }
}

impl MockProbe {
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn break_source(&self, src: &str) {
        self.broken.lock().unwrap().insert(src.to_owned());
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageProbe for MockProbe {
    async fn load(&self, src: &str) -> bool {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        !self.broken.lock().unwrap().contains(src)
    }
}

/// Document head collecting injected directives.
#[derive(Debug, Default)]
pub struct MockSink {
    directives: Mutex<Vec<PreloadDirective>>,
}

impl MockSink {
    pub fn directives(&self) -> Vec<PreloadDirective> {
        self.directives.lock().unwrap().clone()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.directives
            .lock()
            .unwrap()
            .iter()
            .filter(|directive| directive.url == url)
            .count()
    }
}

impl PreloadSink for MockSink {
    fn inject(&self, directive: PreloadDirective) {
        self.directives.lock().unwrap().push(directive);
    }
}

//! One page's worth of caching and preloading components.

use std::sync::Arc;

use offgrid_backend::KeyValueStore;
use offgrid_core::{Language, SharedClock, SystemClock};
use serde_json::Value;
use tracing::info;

use crate::config::PageConfig;
use crate::connectivity::Connectivity;
use crate::image::{ImageProbe, ImageValidator};
use crate::load_state::ImageLoadRegistry;
use crate::memory::MemoryCache;
use crate::persistent::{PersistentCache, RefreshHook};
use crate::preload::{PreloadSink, ResourcePreloader};
use crate::scroll::{CardLayout, ScrollWatcher};
use crate::task::TaskHandle;

/// Every page layer component, created once per page load.
///
/// Components are owned here and handed out by reference, so tests get
/// fresh state by building a fresh context.
pub struct PageContext<K, S, P> {
    config: Arc<PageConfig>,
    language: Language,
    path: String,
    connectivity: Connectivity,
    memory: MemoryCache<Value>,
    persistent: PersistentCache<K>,
    preloader: Arc<ResourcePreloader<S>>,
    validator: ImageValidator<P>,
    images: ImageLoadRegistry,
    tasks: Vec<TaskHandle>,
}

impl<K, S, P> std::fmt::Debug for PageContext<K, S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("online", &self.connectivity.is_online())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl<K, S, P> PageContext<K, S, P>
where
    K: KeyValueStore + 'static,
    S: PreloadSink + 'static,
    P: ImageProbe + 'static,
{
    /// Starts background work and the page-init preloads.
    ///
    /// Spawns the memory cache sweeper and the connectivity watcher, then
    /// preloads the critical resources and the predicted next pages.
    /// Returns how many directives were injected. Background tasks stop
    /// when the context is dropped.
    pub fn init(&mut self) -> usize {
        if self.tasks.is_empty() {
            self.tasks.push(self.memory.spawn_sweeper(self.config.sweep_interval));
            self.tasks.push(self.persistent.watch_connectivity());
        }
        let injected = self.preloader.preload_critical() + self.preloader.predict_for(&self.path);
        info!(path = %self.path, language = %self.language, injected, "page layer initialised");
        injected
    }

    /// Starts preloading city cards near the viewport as the page scrolls.
    pub fn watch_scroll<L>(&self, layout: L) -> ScrollWatcher
    where
        L: CardLayout + 'static,
    {
        ScrollWatcher::spawn(Arc::clone(&self.preloader), layout, self.config.scroll_debounce)
    }

    /// Banner text while offline, in the page's language.
    pub fn offline_notice(&self) -> Option<&'static str> {
        (!self.connectivity.is_online()).then(|| self.language.offline_notice())
    }

    /// Page configuration.
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Language of the page.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Connectivity flag of the page.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Short-lived memory cache.
    pub fn memory(&self) -> &MemoryCache<Value> {
        &self.memory
    }

    /// Persisted cache.
    pub fn persistent(&self) -> &PersistentCache<K> {
        &self.persistent
    }

    /// Resource preloader.
    pub fn preloader(&self) -> &ResourcePreloader<S> {
        &self.preloader
    }

    /// Image validator.
    pub fn validator(&self) -> &ImageValidator<P> {
        &self.validator
    }

    /// Image load states.
    pub fn images(&self) -> &ImageLoadRegistry {
        &self.images
    }
}

/// Builder for [`PageContext`].
pub struct PageContextBuilder {
    config: PageConfig,
    path: String,
    clock: SharedClock,
    connectivity: Connectivity,
    refresh: Option<Arc<dyn RefreshHook>>,
}

impl PageContextBuilder {
    /// Create a new builder for a page at `path`.
    pub fn new(config: PageConfig, path: impl Into<String>) -> Self {
        Self {
            config,
            path: path.into(),
            clock: Arc::new(SystemClock),
            connectivity: Connectivity::default(),
            refresh: None,
        }
    }

    /// Set the clock of both caches.
    pub fn clock(self, clock: SharedClock) -> Self {
        Self { clock, ..self }
    }

    /// Set the connectivity flag.
    pub fn connectivity(self, connectivity: Connectivity) -> Self {
        Self {
            connectivity,
            ..self
        }
    }

    /// Set the hook run when connectivity returns.
    pub fn refresh_hook(self, refresh: Arc<dyn RefreshHook>) -> Self {
        Self {
            refresh: Some(refresh),
            ..self
        }
    }

    /// Build the context over the host's storage, head and image loader.
    pub fn build<K, S, P>(self, store: K, sink: S, probe: P) -> PageContext<K, S, P>
    where
        K: KeyValueStore + 'static,
        S: PreloadSink + 'static,
        P: ImageProbe + 'static,
    {
        let config = self.config;
        let mut persistent = PersistentCache::new(store, &config, self.connectivity.clone())
            .with_clock(Arc::clone(&self.clock));
        if let Some(refresh) = self.refresh {
            persistent = persistent.with_refresh_hook(refresh);
        }
        PageContext {
            language: Language::from_path(&self.path),
            path: self.path,
            memory: MemoryCache::with_clock(config.memory_ttl, self.clock),
            persistent,
            preloader: Arc::new(ResourcePreloader::new(sink, &config)),
            validator: ImageValidator::new(probe, config.probe_timeout),
            images: ImageLoadRegistry::new(),
            connectivity: self.connectivity,
            config: Arc::new(config),
            tasks: Vec::new(),
        }
    }
}

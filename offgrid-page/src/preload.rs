//! Speculative prefetching of documents and images.
//!
//! Every heuristic funnels into [`ResourcePreloader::preload_resource`],
//! which injects at most one prefetch directive per URL for the lifetime
//! of the page.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use http::Uri;
use offgrid_core::{Language, Origin};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::config::PageConfig;
use crate::scroll::{CityCard, Viewport};

/// What a preloaded URL is, as the host's prefetch directive types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// An image.
    Image,
    /// A page.
    Document,
    /// A script.
    Script,
    /// A stylesheet.
    Style,
}

impl ResourceType {
    /// Name used in the directive's `as` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Document => "document",
            ResourceType::Script => "script",
            ResourceType::Style => "style",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low-priority hint asking the host to fetch a URL ahead of need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadDirective {
    /// URL to fetch.
    pub url: String,
    /// Resource type of the URL.
    pub kind: ResourceType,
    /// Link relation, always `prefetch`.
    pub rel: SmolStr,
}

impl PreloadDirective {
    /// A `prefetch` directive for `url`.
    pub fn prefetch(url: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            url: url.into(),
            kind,
            rel: SmolStr::new_static("prefetch"),
        }
    }
}

/// Where preload directives go, typically the document head.
pub trait PreloadSink: Send + Sync {
    /// Injects one directive.
    fn inject(&self, directive: PreloadDirective);
}

impl<P> PreloadSink for Arc<P>
where
    P: PreloadSink + ?Sized,
{
    fn inject(&self, directive: PreloadDirective) {
        (**self).inject(directive)
    }
}

/// Kind of page, as far as navigation prediction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Site root in either language.
    Home,
    /// City index in either language.
    CityList,
    /// Anything else.
    Other,
}

impl PageKind {
    /// Classifies a root-relative path.
    pub fn of(path: &str) -> Self {
        let language = Language::from_path(path);
        let local = path.strip_prefix(language.prefix()).unwrap_or(path);
        match local {
            "" | "/" | "/index.html" => PageKind::Home,
            "/cities" | "/cities/" => PageKind::CityList,
            _ => PageKind::Other,
        }
    }
}

/// Deduplicating prefetch driver.
pub struct ResourcePreloader<P> {
    requested: DashSet<String>,
    sink: P,
    origin: Origin,
    critical: Vec<(String, ResourceType)>,
    popular_cities: Vec<String>,
    proximity_px: f64,
}

impl<P> fmt::Debug for ResourcePreloader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePreloader")
            .field("origin", &self.origin)
            .field("requested", &self.requested.len())
            .finish_non_exhaustive()
    }
}

impl<P> ResourcePreloader<P>
where
    P: PreloadSink,
{
    /// Preloader writing directives to `sink`.
    pub fn new(sink: P, config: &PageConfig) -> Self {
        Self {
            requested: DashSet::new(),
            sink,
            origin: config.origin.clone(),
            critical: config.critical_resources.clone(),
            popular_cities: config.popular_cities.clone(),
            proximity_px: config.proximity_px,
        }
    }

    /// Requests `url` once per page lifetime.
    ///
    /// Returns whether a directive was injected.
    pub fn preload_resource(&self, url: &str, kind: ResourceType) -> bool {
        if !self.requested.insert(url.to_owned()) {
            trace!(url, "already preloaded");
            return false;
        }
        debug!(url, %kind, "preloading");
        self.sink.inject(PreloadDirective::prefetch(url, kind));
        true
    }

    /// Whether `url` was already requested.
    pub fn is_requested(&self, url: &str) -> bool {
        self.requested.contains(url)
    }

    /// Number of distinct URLs requested so far.
    pub fn requested_len(&self) -> usize {
        self.requested.len()
    }

    /// Preloads the critical resource list. Returns how many were new.
    pub fn preload_critical(&self) -> usize {
        self.critical
            .iter()
            .filter(|(url, kind)| self.preload_resource(url, *kind))
            .count()
    }

    /// Hover over a link: preloads its target if it stays on this origin.
    pub fn on_link_hover(&self, href: &str) -> bool {
        match self.same_origin_path(href) {
            Some(path) => self.preload_resource(&path, ResourceType::Document),
            None => {
                trace!(href, "hovered link leaves the site");
                false
            }
        }
    }

    fn same_origin_path(&self, href: &str) -> Option<String> {
        if href.starts_with('/') && !href.starts_with("//") {
            return Some(href.to_owned());
        }
        let uri: Uri = href.parse().ok()?;
        if Origin::of(&uri)? != self.origin {
            return None;
        }
        Some(
            uri.path_and_query()
                .map_or_else(|| "/".to_owned(), |pq| pq.as_str().to_owned()),
        )
    }

    /// Preloads the pages a visitor of `path` most likely opens next.
    ///
    /// From the home page both city lists; from a city list the popular
    /// cities in the list's language.
    pub fn predict_for(&self, path: &str) -> usize {
        let targets: Vec<String> = match PageKind::of(path) {
            PageKind::Home => vec![
                Language::Zh.localize("/cities/"),
                Language::En.localize("/cities/"),
            ],
            PageKind::CityList => {
                let language = Language::from_path(path);
                self.popular_cities
                    .iter()
                    .map(|city| language.localize(&format!("/cities/{city}")))
                    .collect()
            }
            PageKind::Other => Vec::new(),
        };
        targets
            .iter()
            .filter(|url| self.preload_resource(url, ResourceType::Document))
            .count()
    }

    /// Preloads links and images of cards near the viewport.
    pub fn preload_near(&self, cards: &[CityCard], viewport: Viewport) -> usize {
        let mut injected = 0;
        for card in cards.iter().filter(|card| card.is_near(viewport, self.proximity_px)) {
            if let Some(path) = self.same_origin_path(&card.href)
                && self.preload_resource(&path, ResourceType::Document)
            {
                injected += 1;
            }
            if let Some(image) = &card.image
                && self.preload_resource(image, ResourceType::Image)
            {
                injected += 1;
            }
        }
        injected
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink(pub(crate) Mutex<Vec<PreloadDirective>>);

    impl RecordingSink {
        pub(crate) fn urls(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|d| d.url.clone()).collect()
        }
    }

    impl PreloadSink for RecordingSink {
        fn inject(&self, directive: PreloadDirective) {
            self.0.lock().unwrap().push(directive);
        }
    }

    fn preloader() -> ResourcePreloader<Arc<RecordingSink>> {
        let config = PageConfig::builder(Origin::parse("https://devcommunity.cn").unwrap())
            .build()
            .unwrap();
        ResourcePreloader::new(Arc::new(RecordingSink::default()), &config)
    }

    #[test]
    fn preloading_twice_injects_once() {
        let preloader = preloader();
        assert!(preloader.preload_resource("/images/a.webp", ResourceType::Image));
        assert!(!preloader.preload_resource("/images/a.webp", ResourceType::Image));

        let directives = preloader.sink.0.lock().unwrap().clone();
        assert_eq!(
            directives,
            vec![PreloadDirective::prefetch("/images/a.webp", ResourceType::Image)]
        );
        assert_eq!(directives[0].rel, "prefetch");
    }

    #[test]
    fn critical_resources_once() {
        let preloader = preloader();
        assert_eq!(preloader.preload_critical(), 3);
        assert_eq!(preloader.preload_critical(), 0);
    }

    #[test]
    fn hover_only_follows_same_origin() {
        let preloader = preloader();
        assert!(preloader.on_link_hover("https://devcommunity.cn/en/cities/"));
        assert!(!preloader.on_link_hover("/en/cities/"));
        assert!(!preloader.on_link_hover("https://example.com/"));
        assert!(!preloader.on_link_hover("//example.com/x"));
        assert_eq!(preloader.sink.urls(), vec!["/en/cities/"]);
    }

    #[test]
    fn page_kinds() {
        assert_eq!(PageKind::of("/"), PageKind::Home);
        assert_eq!(PageKind::of("/en/"), PageKind::Home);
        assert_eq!(PageKind::of("/cities/"), PageKind::CityList);
        assert_eq!(PageKind::of("/en/cities"), PageKind::CityList);
        assert_eq!(PageKind::of("/cities/beijing"), PageKind::Other);
    }

    #[test]
    fn predicts_next_pages() {
        let preloader = preloader();
        assert_eq!(preloader.predict_for("/"), 2);
        assert_eq!(preloader.predict_for("/en/cities/"), 4);
        assert_eq!(preloader.predict_for("/about"), 0);
        assert_eq!(
            preloader.sink.urls(),
            vec![
                "/cities/",
                "/en/cities/",
                "/en/cities/beijing",
                "/en/cities/shanghai",
                "/en/cities/shenzhen",
                "/en/cities/hangzhou",
            ]
        );
    }
}

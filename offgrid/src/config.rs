//! Interceptor configuration.
//!
//! [`InterceptorConfig`] gathers everything the interceptor needs to know
//! about the site: its origin, the versioned cache names, the install
//! manifest, where the offline page lives, how to recognise static and
//! dynamic resources, the trim thresholds and the notification styling.
//!
//! ```
//! use offgrid::config::InterceptorConfig;
//! use offgrid_core::{CacheKind, Origin};
//!
//! let config = InterceptorConfig::builder(Origin::parse("https://devcommunity.cn").unwrap())
//!     .site("devcommunity")
//!     .version("v2")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.cache_names.get(CacheKind::Dynamic).as_str(), "devcommunity-dynamic-v2");
//! assert_eq!(config.trim.max_entries, 100);
//! ```

use http::uri::InvalidUri;
use offgrid_core::{CacheNames, Origin};
use regex::Regex;
use smol_str::SmolStr;
use thiserror::Error;

/// Paths written into the `static` cache on install.
pub const DEFAULT_MANIFEST: [&str; 10] = [
    "/",
    "/en/",
    "/cities/",
    "/en/cities/",
    "/manifest.json",
    "/favicon.svg",
    "/images/logo.png",
    "/images/hero-bg.webp",
    "/images/community.webp",
    "/images/og-image.jpg",
];

/// Path patterns of content served network-first.
pub const DEFAULT_DYNAMIC_PATTERNS: [&str; 4] = [
    r"^/cities/[^/]+$",
    r"^/en/cities/[^/]+$",
    r"^/images/cities/.+\.(webp|jpg|png)$",
    r"^/api/.+$",
];

/// Path segments whose contents are always static.
pub const DEFAULT_STATIC_PREFIXES: [&str; 2] = ["/assets/", "/_astro/"];

/// File extensions that are always static.
pub const DEFAULT_STATIC_EXTENSIONS: [&str; 4] = ["css", "js", "woff", "woff2"];

/// Default offline fallback page.
pub const DEFAULT_OFFLINE_PAGE: &str = "/offline.html";

/// Errors raised while building an [`InterceptorConfig`].
#[derive(Debug, Error)]
pub enum ConfigBuildError {
    /// A dynamic-content pattern is not a valid regex.
    #[error("invalid dynamic pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },
    /// A configured path does not form a URL under the origin.
    #[error("invalid path `{path}`: {source}")]
    Path {
        /// The offending path.
        path: String,
        /// Parse error.
        #[source]
        source: InvalidUri,
    },
    /// Configured paths must be root-relative.
    #[error("path `{0}` must start with `/`")]
    RelativePath(String),
    /// The trim policy would keep more entries than it allows.
    #[error("trim keeps {keep} entries but triggers above {max}")]
    Trim {
        /// Trigger threshold.
        max: usize,
        /// Entries kept after trimming.
        keep: usize,
    },
}

/// Entry-count thresholds of the cache trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    /// A cache holding more entries than this is trimmed.
    pub max_entries: usize,
    /// Number of most recently written entries kept after a trim.
    pub keep_entries: usize,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            max_entries: 100,
            keep_entries: 50,
        }
    }
}

/// Icon and badge attached to push notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStyle {
    /// Large icon path.
    pub icon: SmolStr,
    /// Monochrome badge path.
    pub badge: SmolStr,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            icon: SmolStr::new_static("/images/logo.png"),
            badge: SmolStr::new_static("/favicon.svg"),
        }
    }
}

/// Runtime configuration of the [`Interceptor`](crate::Interceptor).
#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// The only origin whose requests are intercepted.
    pub origin: Origin,
    /// Names of the three current caches.
    pub cache_names: CacheNames,
    /// Paths fetched and stored all-or-nothing on install.
    pub manifest: Vec<String>,
    /// Page served to navigations that miss while offline.
    pub offline_page: String,
    /// Site root served to dynamic and default navigations while offline.
    pub root_page: String,
    /// Path segments marking static assets.
    pub static_prefixes: Vec<String>,
    /// File extensions marking static assets, without the dot.
    pub static_extensions: Vec<String>,
    /// Path patterns of network-first content.
    pub dynamic_patterns: Vec<Regex>,
    /// Cache trim thresholds.
    pub trim: TrimPolicy,
    /// Push notification styling.
    pub notification: NotificationStyle,
}

impl InterceptorConfig {
    /// Create a new builder for the given origin.
    pub fn builder(origin: Origin) -> InterceptorConfigBuilder {
        InterceptorConfigBuilder::new(origin)
    }
}

/// Builder for [`InterceptorConfig`].
#[derive(Debug, Clone)]
pub struct InterceptorConfigBuilder {
    origin: Origin,
    site: String,
    version: String,
    manifest: Vec<String>,
    offline_page: String,
    root_page: String,
    static_prefixes: Vec<String>,
    static_extensions: Vec<String>,
    dynamic_patterns: Vec<String>,
    trim: TrimPolicy,
    notification: NotificationStyle,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

impl InterceptorConfigBuilder {
    /// Create a builder with the default site layout.
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            site: "devcommunity".to_owned(),
            version: "v1".to_owned(),
            manifest: owned(&DEFAULT_MANIFEST),
            offline_page: DEFAULT_OFFLINE_PAGE.to_owned(),
            root_page: "/".to_owned(),
            static_prefixes: owned(&DEFAULT_STATIC_PREFIXES),
            static_extensions: owned(&DEFAULT_STATIC_EXTENSIONS),
            dynamic_patterns: owned(&DEFAULT_DYNAMIC_PATTERNS),
            trim: TrimPolicy::default(),
            notification: NotificationStyle::default(),
        }
    }

    /// Set the site prefix of cache names. Empty means no prefix.
    pub fn site(self, site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..self
        }
    }

    /// Set the cache version tag.
    pub fn version(self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self
        }
    }

    /// Replace the install manifest.
    pub fn manifest<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            manifest: paths.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Set the offline fallback page.
    pub fn offline_page(self, path: impl Into<String>) -> Self {
        Self {
            offline_page: path.into(),
            ..self
        }
    }

    /// Set the site root page.
    pub fn root_page(self, path: impl Into<String>) -> Self {
        Self {
            root_page: path.into(),
            ..self
        }
    }

    /// Replace the static path segments.
    pub fn static_prefixes<I, P>(self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            static_prefixes: prefixes.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Replace the static file extensions.
    pub fn static_extensions<I, P>(self, extensions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            static_extensions: extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_owned())
                .collect(),
            ..self
        }
    }

    /// Replace the dynamic-content patterns.
    pub fn dynamic_patterns<I, P>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            dynamic_patterns: patterns.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Set the trim thresholds.
    pub fn trim(self, max_entries: usize, keep_entries: usize) -> Self {
        Self {
            trim: TrimPolicy {
                max_entries,
                keep_entries,
            },
            ..self
        }
    }

    /// Set the notification styling.
    pub fn notification(self, notification: NotificationStyle) -> Self {
        Self {
            notification,
            ..self
        }
    }

    /// Validate paths, compile patterns and build the config.
    pub fn build(self) -> Result<InterceptorConfig, ConfigBuildError> {
        if self.trim.keep_entries > self.trim.max_entries {
            return Err(ConfigBuildError::Trim {
                max: self.trim.max_entries,
                keep: self.trim.keep_entries,
            });
        }

        let paths = self
            .manifest
            .iter()
            .chain([&self.offline_page, &self.root_page]);
        for path in paths {
            if !path.starts_with('/') {
                return Err(ConfigBuildError::RelativePath(path.clone()));
            }
            self.origin
                .join(path)
                .map_err(|source| ConfigBuildError::Path {
                    path: path.clone(),
                    source,
                })?;
        }

        let dynamic_patterns = self
            .dynamic_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigBuildError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InterceptorConfig {
            cache_names: CacheNames::new(&self.site, &self.version),
            origin: self.origin,
            manifest: self.manifest,
            offline_page: self.offline_page,
            root_page: self.root_page,
            static_prefixes: self.static_prefixes,
            static_extensions: self.static_extensions,
            dynamic_patterns,
            trim: self.trim,
            notification: self.notification,
        })
    }
}

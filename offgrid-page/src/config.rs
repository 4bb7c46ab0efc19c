//! Page layer configuration.

use std::time::Duration;

use offgrid_core::Origin;
use thiserror::Error;

use crate::image::DEFAULT_PROBE_TIMEOUT;
use crate::memory::DEFAULT_MEMORY_TTL;
use crate::preload::ResourceType;

/// Key prefix of the persisted cache.
pub const DEFAULT_NAMESPACE: &str = "devcommunity_cache_";
/// TTL of persisted entries.
pub const DEFAULT_PERSIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL multiplier of `offline_` slots.
pub const DEFAULT_OFFLINE_MULTIPLIER: u32 = 7;
/// TTL multiplier of `backup_` slots.
pub const DEFAULT_BACKUP_MULTIPLIER: u32 = 2;
/// Period of the memory cache sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Quiet period after the last scroll.
pub const DEFAULT_SCROLL_DEBOUNCE: Duration = Duration::from_millis(100);
/// Viewport proximity of preloaded cards, in pixels.
pub const DEFAULT_PROXIMITY_PX: f64 = 200.0;

/// Resources preloaded on every page init.
pub const DEFAULT_CRITICAL_RESOURCES: [(&str, ResourceType); 3] = [
    ("/images/logo.png", ResourceType::Image),
    ("/images/hero-bg.webp", ResourceType::Image),
    ("/favicon.svg", ResourceType::Image),
];

/// City slugs whose detail pages are predicted from the city list.
pub const DEFAULT_POPULAR_CITIES: [&str; 4] = ["beijing", "shanghai", "shenzhen", "hangzhou"];

/// A page layer setting that cannot run.
#[derive(Debug, Error, PartialEq)]
#[error("invalid page setting `{field}`: {reason}")]
pub struct PageConfigError {
    /// Name of the offending setting.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl PageConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Runtime configuration of the page layer.
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Origin of the site; hovers over other origins are ignored.
    pub origin: Origin,
    /// Default TTL of the memory cache.
    pub memory_ttl: Duration,
    /// Period of the memory cache sweeper.
    pub sweep_interval: Duration,
    /// Key prefix of the persisted cache.
    pub namespace: String,
    /// Default TTL of the persisted cache.
    pub persist_ttl: Duration,
    /// TTL multiplier of `offline_` slots.
    pub offline_ttl_multiplier: u32,
    /// TTL multiplier of `backup_` slots.
    pub backup_ttl_multiplier: u32,
    /// Resources preloaded on init.
    pub critical_resources: Vec<(String, ResourceType)>,
    /// City slugs predicted from the city list.
    pub popular_cities: Vec<String>,
    /// Quiet period after the last scroll before proximity is checked.
    pub scroll_debounce: Duration,
    /// Distance from the viewport, in pixels, within which cards preload.
    pub proximity_px: f64,
    /// Hard limit on one image probe.
    pub probe_timeout: Duration,
}

impl PageConfig {
    /// Create a new builder for the given origin.
    pub fn builder(origin: Origin) -> PageConfigBuilder {
        PageConfigBuilder::new(origin)
    }
}

/// Builder for [`PageConfig`].
#[derive(Debug, Clone)]
pub struct PageConfigBuilder {
    config: PageConfig,
}

impl PageConfigBuilder {
    /// Create a builder with the default page layer settings.
    pub fn new(origin: Origin) -> Self {
        Self {
            config: PageConfig {
                origin,
                memory_ttl: DEFAULT_MEMORY_TTL,
                sweep_interval: DEFAULT_SWEEP_INTERVAL,
                namespace: DEFAULT_NAMESPACE.to_owned(),
                persist_ttl: DEFAULT_PERSIST_TTL,
                offline_ttl_multiplier: DEFAULT_OFFLINE_MULTIPLIER,
                backup_ttl_multiplier: DEFAULT_BACKUP_MULTIPLIER,
                critical_resources: DEFAULT_CRITICAL_RESOURCES
                    .iter()
                    .map(|(url, kind)| ((*url).to_owned(), *kind))
                    .collect(),
                popular_cities: DEFAULT_POPULAR_CITIES
                    .iter()
                    .map(|city| (*city).to_owned())
                    .collect(),
                scroll_debounce: DEFAULT_SCROLL_DEBOUNCE,
                proximity_px: DEFAULT_PROXIMITY_PX,
                probe_timeout: DEFAULT_PROBE_TIMEOUT,
            },
        }
    }

    /// Set the memory cache TTL.
    pub fn memory_ttl(mut self, ttl: Duration) -> Self {
        self.config.memory_ttl = ttl;
        self
    }

    /// Set the sweeper period.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the persisted cache namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the persisted cache TTL.
    pub fn persist_ttl(mut self, ttl: Duration) -> Self {
        self.config.persist_ttl = ttl;
        self
    }

    /// Set the `offline_` and `backup_` TTL multipliers.
    pub fn tier_multipliers(mut self, offline: u32, backup: u32) -> Self {
        self.config.offline_ttl_multiplier = offline;
        self.config.backup_ttl_multiplier = backup;
        self
    }

    /// Replace the critical resource list.
    pub fn critical_resources<I, U>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = (U, ResourceType)>,
        U: Into<String>,
    {
        self.config.critical_resources = resources
            .into_iter()
            .map(|(url, kind)| (url.into(), kind))
            .collect();
        self
    }

    /// Replace the popular city list.
    pub fn popular_cities<I, C>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.config.popular_cities = cities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the scroll debounce.
    pub fn scroll_debounce(mut self, debounce: Duration) -> Self {
        self.config.scroll_debounce = debounce;
        self
    }

    /// Set the viewport proximity in pixels.
    pub fn proximity_px(mut self, proximity: f64) -> Self {
        self.config.proximity_px = proximity;
        self
    }

    /// Set the image probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Build the PageConfig, rejecting settings the page layer cannot run with.
    pub fn build(self) -> Result<PageConfig, PageConfigError> {
        let config = self.config;
        if config.namespace.is_empty() {
            return Err(PageConfigError::new("namespace", "must not be empty"));
        }
        if config.memory_ttl.is_zero() {
            return Err(PageConfigError::new("memory_ttl", "must be positive"));
        }
        // tokio::time::interval panics on a zero period.
        if config.sweep_interval.is_zero() {
            return Err(PageConfigError::new("sweep_interval", "must be positive"));
        }
        if config.offline_ttl_multiplier == 0 {
            return Err(PageConfigError::new(
                "offline_ttl_multiplier",
                "must be at least 1",
            ));
        }
        if config.backup_ttl_multiplier == 0 {
            return Err(PageConfigError::new(
                "backup_ttl_multiplier",
                "must be at least 1",
            ));
        }
        if !config.proximity_px.is_finite() || config.proximity_px < 0.0 {
            return Err(PageConfigError::new(
                "proximity_px",
                format!("{} is not a distance", config.proximity_px),
            ));
        }
        if let Some((url, _)) = config
            .critical_resources
            .iter()
            .find(|(url, _)| !url.starts_with('/'))
        {
            return Err(PageConfigError::new(
                "critical_resources",
                format!("`{url}` must start with `/`"),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PageConfigBuilder {
        PageConfig::builder(Origin::parse("https://devcommunity.cn").unwrap())
    }

    #[test]
    fn defaults_build() {
        let config = builder().build().unwrap();
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert_eq!(config.critical_resources.len(), 3);
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = builder().sweep_interval(Duration::ZERO).build().unwrap_err();
        assert_eq!(err.field, "sweep_interval");
    }

    #[test]
    fn zero_tier_multiplier_is_rejected() {
        let err = builder().tier_multipliers(7, 0).build().unwrap_err();
        assert_eq!(err.field, "backup_ttl_multiplier");
    }

    #[test]
    fn negative_proximity_is_rejected() {
        let err = builder().proximity_px(-1.0).build().unwrap_err();
        assert_eq!(err.field, "proximity_px");
    }

    #[test]
    fn relative_critical_resource_is_rejected() {
        let err = builder()
            .critical_resources([("logo.png", ResourceType::Image)])
            .build()
            .unwrap_err();
        assert_eq!(err.field, "critical_resources");
    }
}

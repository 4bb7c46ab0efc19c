use std::time::Duration;

use offgrid_core::Origin;
use offgrid_page::ResourceType;
use offgrid_page::config::{
    DEFAULT_BACKUP_MULTIPLIER, DEFAULT_CRITICAL_RESOURCES, DEFAULT_NAMESPACE,
    DEFAULT_OFFLINE_MULTIPLIER, DEFAULT_PERSIST_TTL, DEFAULT_POPULAR_CITIES, DEFAULT_PROXIMITY_PX,
    DEFAULT_SCROLL_DEBOUNCE, DEFAULT_SWEEP_INTERVAL, PageConfig,
};
use offgrid_page::image::DEFAULT_PROBE_TIMEOUT;
use offgrid_page::memory::DEFAULT_MEMORY_TTL;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
}

/// `page:` section of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Page {
    #[serde(with = "humantime_serde")]
    pub memory_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    pub namespace: String,
    #[serde(with = "humantime_serde")]
    pub persist_ttl: Duration,
    pub offline_ttl_multiplier: u32,
    pub backup_ttl_multiplier: u32,
    pub critical_resources: Vec<Resource>,
    pub popular_cities: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub scroll_debounce: Duration,
    pub proximity_px: f64,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            memory_ttl: DEFAULT_MEMORY_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            persist_ttl: DEFAULT_PERSIST_TTL,
            offline_ttl_multiplier: DEFAULT_OFFLINE_MULTIPLIER,
            backup_ttl_multiplier: DEFAULT_BACKUP_MULTIPLIER,
            critical_resources: DEFAULT_CRITICAL_RESOURCES
                .iter()
                .map(|(url, kind)| Resource {
                    url: (*url).to_owned(),
                    kind: *kind,
                })
                .collect(),
            popular_cities: DEFAULT_POPULAR_CITIES
                .iter()
                .map(|city| (*city).to_owned())
                .collect(),
            scroll_debounce: DEFAULT_SCROLL_DEBOUNCE,
            proximity_px: DEFAULT_PROXIMITY_PX,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl Page {
    /// Validates the section into the runtime configuration.
    pub fn into_config(self, origin: Origin) -> Result<PageConfig, ConfigError> {
        Ok(PageConfig::builder(origin)
            .memory_ttl(self.memory_ttl)
            .sweep_interval(self.sweep_interval)
            .namespace(self.namespace)
            .persist_ttl(self.persist_ttl)
            .tier_multipliers(self.offline_ttl_multiplier, self.backup_ttl_multiplier)
            .critical_resources(
                self.critical_resources
                    .into_iter()
                    .map(|resource| (resource.url, resource.kind)),
            )
            .popular_cities(self.popular_cities)
            .scroll_debounce(self.scroll_debounce)
            .proximity_px(self.proximity_px)
            .probe_timeout(self.probe_timeout)
            .build()?)
    }
}

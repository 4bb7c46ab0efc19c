//! YAML configuration for offgrid.
//!
//! One file configures both layers for a site:
//!
//! ```yaml
//! origin: https://devcommunity.cn
//! interceptor:
//!   version: v2
//!   trim:
//!     max_entries: 200
//!     keep_entries: 100
//! page:
//!   memory_ttl: 10m
//!   popular_cities: [beijing, chengdu]
//! ```
//!
//! Every field except `origin` is optional and falls back to the runtime
//! defaults. Durations use humantime notation (`100ms`, `5m`, `24h`).

pub mod error;
pub mod interceptor;
pub mod page;

pub use error::ConfigError;
pub use interceptor::Interceptor;
pub use page::Page;

use offgrid::config::InterceptorConfig;
use offgrid_core::Origin;
use offgrid_page::PageConfig;
use serde::{Deserialize, Serialize};

/// Root of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub origin: String,
    #[serde(default)]
    pub interceptor: Interceptor,
    #[serde(default)]
    pub page: Page,
}

/// Validated runtime configuration of both layers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub interceptor: InterceptorConfig,
    pub page: PageConfig,
}

impl Config {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Builds the runtime configuration of both layers.
    pub fn into_runtime(self) -> Result<RuntimeConfig, ConfigError> {
        let origin = Origin::parse(&self.origin)?;
        Ok(RuntimeConfig {
            interceptor: self.interceptor.into_config(origin.clone())?,
            page: self.page.into_config(origin)?,
        })
    }
}

/// Parses and validates a YAML document in one step.
pub fn from_yaml(yaml: &str) -> Result<RuntimeConfig, ConfigError> {
    Config::from_yaml(yaml)?.into_runtime()
}

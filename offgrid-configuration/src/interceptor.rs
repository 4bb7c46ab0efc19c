use offgrid::config::{
    DEFAULT_DYNAMIC_PATTERNS, DEFAULT_MANIFEST, DEFAULT_OFFLINE_PAGE, DEFAULT_STATIC_EXTENSIONS,
    DEFAULT_STATIC_PREFIXES, InterceptorConfig, NotificationStyle, TrimPolicy,
};
use offgrid_core::Origin;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;

fn owned<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Trim {
    pub max_entries: usize,
    pub keep_entries: usize,
}

impl Default for Trim {
    fn default() -> Self {
        let policy = TrimPolicy::default();
        Self {
            max_entries: policy.max_entries,
            keep_entries: policy.keep_entries,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Notification {
    pub icon: String,
    pub badge: String,
}

impl Default for Notification {
    fn default() -> Self {
        let style = NotificationStyle::default();
        Self {
            icon: style.icon.to_string(),
            badge: style.badge.to_string(),
        }
    }
}

impl From<Notification> for NotificationStyle {
    fn from(notification: Notification) -> Self {
        NotificationStyle {
            icon: SmolStr::new(notification.icon),
            badge: SmolStr::new(notification.badge),
        }
    }
}

/// `interceptor:` section of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Interceptor {
    pub site: String,
    pub version: String,
    pub manifest: Vec<String>,
    pub offline_page: String,
    pub root_page: String,
    pub static_prefixes: Vec<String>,
    pub static_extensions: Vec<String>,
    pub dynamic_patterns: Vec<String>,
    pub trim: Trim,
    pub notification: Notification,
}

impl Default for Interceptor {
    fn default() -> Self {
        Self {
            site: "devcommunity".to_owned(),
            version: "v1".to_owned(),
            manifest: owned(DEFAULT_MANIFEST),
            offline_page: DEFAULT_OFFLINE_PAGE.to_owned(),
            root_page: "/".to_owned(),
            static_prefixes: owned(DEFAULT_STATIC_PREFIXES),
            static_extensions: owned(DEFAULT_STATIC_EXTENSIONS),
            dynamic_patterns: owned(DEFAULT_DYNAMIC_PATTERNS),
            trim: Trim::default(),
            notification: Notification::default(),
        }
    }
}

impl Interceptor {
    /// Compiles patterns and validates paths into the runtime configuration.
    pub fn into_config(self, origin: Origin) -> Result<InterceptorConfig, ConfigError> {
        let config = InterceptorConfig::builder(origin)
            .site(self.site)
            .version(self.version)
            .manifest(self.manifest)
            .offline_page(self.offline_page)
            .root_page(self.root_page)
            .static_prefixes(self.static_prefixes)
            .static_extensions(self.static_extensions)
            .dynamic_patterns(self.dynamic_patterns)
            .trim(self.trim.max_entries, self.trim.keep_entries)
            .notification(self.notification.into())
            .build()?;
        Ok(config)
    }
}

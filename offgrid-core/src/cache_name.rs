//! Versioned cache names.
//!
//! Three named caches exist at any time, one per [`CacheKind`]. Each name
//! embeds a version tag; bumping the version is the only migration
//! protocol: on the next activation every cache whose name is not one of
//! the three current [`CacheNames`] is deleted.
//!
//! ```
//! use offgrid_core::{CacheKind, CacheName, CacheNames};
//!
//! let names = CacheNames::new("", "v1");
//! assert_eq!(names.get(CacheKind::Static).as_str(), "static-v1");
//! assert!(names.is_current(&CacheName::from("image-v1")));
//! assert!(!names.is_current(&CacheName::from("static-v0")));
//! ```

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

/// Resource class a named cache is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Site shell, fonts, scripts and styles.
    Static,
    /// Navigable HTML and API-shaped responses.
    Dynamic,
    /// Image payloads.
    Image,
}

impl CacheKind {
    /// All kinds, in activation order.
    pub const ALL: [CacheKind; 3] = [CacheKind::Static, CacheKind::Dynamic, CacheKind::Image];

    /// Lowercase label used inside cache names and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Static => "static",
            CacheKind::Dynamic => "dynamic",
            CacheKind::Image => "image",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one named cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheName(SmolStr);

impl CacheName {
    /// Wraps an arbitrary cache name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    /// Builds `{site}-{kind}-{version}`, or `{kind}-{version}` without a site.
    pub fn versioned(site: &str, kind: CacheKind, version: &str) -> Self {
        if site.is_empty() {
            Self(format_smolstr!("{kind}-{version}"))
        } else {
            Self(format_smolstr!("{site}-{kind}-{version}"))
        }
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for CacheName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The three current cache names for one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    static_assets: CacheName,
    dynamic: CacheName,
    image: CacheName,
}

impl CacheNames {
    /// Derives the current names from a site prefix and a version tag.
    pub fn new(site: &str, version: &str) -> Self {
        Self {
            static_assets: CacheName::versioned(site, CacheKind::Static, version),
            dynamic: CacheName::versioned(site, CacheKind::Dynamic, version),
            image: CacheName::versioned(site, CacheKind::Image, version),
        }
    }

    /// The current name for `kind`.
    pub fn get(&self, kind: CacheKind) -> &CacheName {
        match kind {
            CacheKind::Static => &self.static_assets,
            CacheKind::Dynamic => &self.dynamic,
            CacheKind::Image => &self.image,
        }
    }

    /// Whether `name` is one of the three current names.
    pub fn is_current(&self, name: &CacheName) -> bool {
        self.iter().any(|current| current == name)
    }

    /// Iterates the current names.
    pub fn iter(&self) -> impl Iterator<Item = &CacheName> {
        CacheKind::ALL.into_iter().map(|kind| self.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_prefix_is_embedded() {
        let names = CacheNames::new("devcommunity", "v3");
        let all: Vec<_> = names.iter().map(CacheName::as_str).collect();
        assert_eq!(
            all,
            vec![
                "devcommunity-static-v3",
                "devcommunity-dynamic-v3",
                "devcommunity-image-v3"
            ]
        );
    }

    #[test]
    fn version_bump_makes_old_names_stale() {
        let old = CacheNames::new("devcommunity", "v1");
        let new = CacheNames::new("devcommunity", "v2");
        assert!(old.iter().all(|name| !new.is_current(name)));
    }
}

//! Request classification.
//!
//! Every intercepted request falls into exactly one [`RequestClass`],
//! evaluated in a fixed order: cross-origin, image, static, dynamic and
//! finally default. The class picks the fetch strategy.

use std::fmt;

use offgrid_core::{CacheKind, Destination, Request};

use crate::config::InterceptorConfig;

/// The strategy bucket of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Another origin. Never intercepted.
    CrossOrigin,
    /// Image destination. Cache-first against the `image` cache.
    Image,
    /// Site shell asset. Cache-first against the `static` cache.
    Static,
    /// Navigable or API content. Network-first into the `dynamic` cache.
    Dynamic,
    /// Everything else. Network only.
    Default,
}

impl RequestClass {
    /// Classifies `request` under `config`.
    ///
    /// ```
    /// use offgrid::{RequestClass, config::InterceptorConfig};
    /// use offgrid_core::{Origin, Request};
    ///
    /// let origin = Origin::parse("https://devcommunity.cn").unwrap();
    /// let config = InterceptorConfig::builder(origin.clone()).build().unwrap();
    /// let get = |path: &str| Request::get(origin.join(path).unwrap());
    ///
    /// assert_eq!(RequestClass::of(&get("/_astro/app.js"), &config), RequestClass::Static);
    /// assert_eq!(RequestClass::of(&get("/cities/beijing"), &config), RequestClass::Dynamic);
    /// assert_eq!(RequestClass::of(&get("/about"), &config), RequestClass::Default);
    /// ```
    pub fn of(request: &Request, config: &InterceptorConfig) -> Self {
        if !config.origin.contains(request) {
            return RequestClass::CrossOrigin;
        }
        if request.destination() == Destination::Image {
            return RequestClass::Image;
        }
        let path = request.path();
        if is_static(path, config) {
            return RequestClass::Static;
        }
        if config
            .dynamic_patterns
            .iter()
            .any(|pattern| pattern.is_match(path))
        {
            return RequestClass::Dynamic;
        }
        RequestClass::Default
    }

    /// The cache this class reads from and writes to, if any.
    pub fn cache_kind(&self) -> Option<CacheKind> {
        match self {
            RequestClass::Image => Some(CacheKind::Image),
            RequestClass::Static => Some(CacheKind::Static),
            RequestClass::Dynamic => Some(CacheKind::Dynamic),
            RequestClass::CrossOrigin | RequestClass::Default => None,
        }
    }

    /// Returns the class as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestClass::CrossOrigin => "cross_origin",
            RequestClass::Image => "image",
            RequestClass::Static => "static",
            RequestClass::Dynamic => "dynamic",
            RequestClass::Default => "default",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A manifest entry of "/" makes every directory-style path static.
fn is_static(path: &str, config: &InterceptorConfig) -> bool {
    config.manifest.iter().any(|entry| path.ends_with(entry.as_str()))
        || config
            .static_prefixes
            .iter()
            .any(|prefix| path.contains(prefix.as_str()))
        || config.static_extensions.iter().any(|ext| {
            path.strip_suffix(ext.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
}

#[cfg(test)]
mod tests {
    use offgrid_core::Origin;

    use super::*;

    fn config() -> InterceptorConfig {
        InterceptorConfig::builder(Origin::parse("https://devcommunity.cn").unwrap())
            .build()
            .unwrap()
    }

    fn classify(url: &str) -> RequestClass {
        RequestClass::of(&Request::parse(url).unwrap(), &config())
    }

    #[test]
    fn cross_origin_wins_over_everything() {
        let request = Request::image("https://cdn.example.com/images/logo.png".parse().unwrap());
        assert_eq!(RequestClass::of(&request, &config()), RequestClass::CrossOrigin);
    }

    #[test]
    fn image_destination_wins_over_dynamic_pattern() {
        let request =
            Request::image("https://devcommunity.cn/images/cities/shanghai.webp".parse().unwrap());
        assert_eq!(RequestClass::of(&request, &config()), RequestClass::Image);
        assert_eq!(
            classify("https://devcommunity.cn/images/cities/shanghai.webp"),
            RequestClass::Dynamic
        );
    }

    #[test]
    fn static_predicate() {
        assert_eq!(classify("https://devcommunity.cn/assets/app.wasm"), RequestClass::Static);
        assert_eq!(classify("https://devcommunity.cn/fonts/inter.woff2"), RequestClass::Static);
        assert_eq!(classify("https://devcommunity.cn/manifest.json"), RequestClass::Static);
        assert_eq!(classify("https://devcommunity.cn/en/cities/"), RequestClass::Static);
        assert_eq!(classify("https://devcommunity.cn/style.css?v=3"), RequestClass::Static);
        assert_eq!(classify("https://devcommunity.cn/docs.json"), RequestClass::Default);
    }

    #[test]
    fn dynamic_patterns_are_anchored() {
        assert_eq!(classify("https://devcommunity.cn/cities/beijing"), RequestClass::Dynamic);
        assert_eq!(classify("https://devcommunity.cn/en/cities/beijing"), RequestClass::Dynamic);
        assert_eq!(classify("https://devcommunity.cn/api/events"), RequestClass::Dynamic);
        assert_eq!(classify("https://devcommunity.cn/api"), RequestClass::Default);
        assert_eq!(classify("https://devcommunity.cn/x/cities/beijing"), RequestClass::Default);
        assert_eq!(
            classify("https://devcommunity.cn/images/cities/beijing.gif"),
            RequestClass::Default
        );
    }
}

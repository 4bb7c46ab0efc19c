//! Intercepted request model.
//!
//! A [`Request`] carries just what routing and caching need: the method,
//! the absolute URL, the fetch destination and the request mode. The cache
//! key of a request is its URL; the method is implicitly `GET`.
//!
//! ```
//! use offgrid_core::{Destination, Origin, Request};
//!
//! let origin = Origin::parse("https://devcommunity.cn").unwrap();
//! let request = Request::image(origin.join("/images/logo.png").unwrap());
//!
//! assert_eq!(request.path(), "/images/logo.png");
//! assert_eq!(request.destination(), Destination::Image);
//! assert!(origin.contains(&request));
//! ```

use std::fmt;

use http::uri::{InvalidUri, Uri};
use http::Method;
use smol_str::SmolStr;
use thiserror::Error;

/// What kind of resource the requester expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    /// No particular destination (e.g. `fetch()` from script).
    #[default]
    Empty,
    /// A top-level or nested document.
    Document,
    /// An image element or CSS image.
    Image,
    /// A script.
    Script,
    /// A stylesheet.
    Style,
    /// A web font.
    Font,
    /// The web app manifest.
    Manifest,
}

/// How the request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestMode {
    /// Page navigation.
    Navigate,
    /// Same-origin only.
    SameOrigin,
    /// Opaque cross-origin subresource.
    #[default]
    NoCors,
    /// CORS request.
    Cors,
}

/// Error returned when a string does not name an origin.
#[derive(Debug, Error)]
pub enum OriginError {
    /// The string is not a URI at all.
    #[error(transparent)]
    Invalid(#[from] InvalidUri),
    /// The URI has no scheme or authority.
    #[error("`{0}` is not an absolute URL")]
    Relative(String),
}

/// Scheme plus authority of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: SmolStr,
    authority: SmolStr,
}

impl Origin {
    /// Parses an origin from any absolute URL; the path is ignored.
    pub fn parse(url: &str) -> Result<Self, OriginError> {
        let uri: Uri = url.parse()?;
        Self::of(&uri).ok_or_else(|| OriginError::Relative(url.to_owned()))
    }

    /// Extracts the origin of an absolute URI.
    pub fn of(uri: &Uri) -> Option<Self> {
        Some(Self {
            scheme: SmolStr::new(uri.scheme_str()?),
            authority: SmolStr::new(uri.authority()?.as_str()),
        })
    }

    /// Builds an absolute URI for `path` under this origin.
    pub fn join(&self, path: &str) -> Result<Uri, InvalidUri> {
        format!("{}://{}{}", self.scheme, self.authority, path).parse()
    }

    /// Whether the request targets this origin.
    pub fn contains(&self, request: &Request) -> bool {
        Origin::of(request.uri()).is_some_and(|origin| &origin == self)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// A request observed by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: Uri,
    destination: Destination,
    mode: RequestMode,
}

impl Request {
    /// A plain `GET` subresource request.
    pub fn get(uri: Uri) -> Self {
        Self {
            method: Method::GET,
            uri,
            destination: Destination::Empty,
            mode: RequestMode::default(),
        }
    }

    /// Parses `url` into a plain `GET` request.
    pub fn parse(url: &str) -> Result<Self, InvalidUri> {
        Ok(Self::get(url.parse()?))
    }

    /// A page navigation request.
    pub fn navigate(uri: Uri) -> Self {
        Self::get(uri)
            .with_destination(Destination::Document)
            .with_mode(RequestMode::Navigate)
    }

    /// An image request.
    pub fn image(uri: Uri) -> Self {
        Self::get(uri).with_destination(Destination::Image)
    }

    /// Sets the fetch destination.
    pub fn with_destination(self, destination: Destination) -> Self {
        Self {
            destination,
            ..self
        }
    }

    /// Sets the request mode.
    pub fn with_mode(self, mode: RequestMode) -> Self {
        Self { mode, ..self }
    }

    /// Sets the method.
    pub fn with_method(self, method: Method) -> Self {
        Self { method, ..self }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The URL path, always starting with `/`.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The fetch destination.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// The request mode.
    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Whether this request is a page navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// The key this request is stored under in a named cache.
    pub fn cache_key(&self) -> String {
        self.uri.to_string()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_rejects_relative_urls() {
        assert!(Origin::parse("/cities/").is_err());
    }

    #[test]
    fn origin_matches_only_same_scheme_and_authority() {
        let origin = Origin::parse("https://devcommunity.cn").unwrap();
        let same = Request::parse("https://devcommunity.cn/en/").unwrap();
        let other_host = Request::parse("https://cdn.example.com/en/").unwrap();
        let other_scheme = Request::parse("http://devcommunity.cn/en/").unwrap();

        assert!(origin.contains(&same));
        assert!(!origin.contains(&other_host));
        assert!(!origin.contains(&other_scheme));
    }

    #[test]
    fn navigation_requests_are_documents() {
        let request = Request::navigate("https://devcommunity.cn/".parse().unwrap());
        assert!(request.is_navigation());
        assert_eq!(request.destination(), Destination::Document);
        assert_eq!(request.cache_key(), "https://devcommunity.cn/");
    }
}

//! Response representation captured by named caches.
//!
//! [`Response`] is an explicit tagged structure `{status, headers, body}`.
//! Headers keep every value of a repeated name and the body is [`Bytes`](bytes::Bytes),
//! so a clone is byte-identical to the original and costs a refcount bump.
//! Cache writes store a clone; the original goes back to the caller.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

/// Response headers. Names keep insertion order; a name may repeat.
pub type Headers = HeaderMap<HeaderValue>;

/// A full response: status, ordered headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A `200 OK` response with no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, Headers::new(), body)
    }

    /// A small plain-text placeholder generated locally instead of fetched.
    ///
    /// ```
    /// use http::StatusCode;
    /// use offgrid_core::Response;
    ///
    /// let response = Response::synthesized(StatusCode::SERVICE_UNAVAILABLE, "Offline");
    /// assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    /// assert_eq!(response.text(), "Offline");
    /// ```
    pub fn synthesized(status: StatusCode, text: &'static str) -> Self {
        Self::new(status, Headers::new(), Bytes::from_static(text.as_bytes()))
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )
    }

    /// Appends a header value, keeping earlier values of the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Response status.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is in the 2xx range.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Response body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Consumes the response and returns its parts.
    pub fn into_parts(self) -> (StatusCode, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Estimated memory held by this response in bytes.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        std::mem::size_of::<Self>() + headers + self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CACHE_CONTROL, SET_COOKIE};
    use pretty_assertions::assert_eq;

    #[test]
    fn clone_is_byte_identical() {
        let response = Response::ok("<html></html>")
            .with_header(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        let clone = response.clone();
        assert_eq!(clone, response);
        assert_eq!(clone.body().as_ptr(), response.body().as_ptr());
    }

    #[test]
    fn headers_keep_insertion_order() {
        let response = Response::ok("")
            .with_header(CACHE_CONTROL, HeaderValue::from_static("no-store"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        let names: Vec<_> = response.headers().keys().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["cache-control", "content-type"]);
    }

    #[test]
    fn only_2xx_is_ok() {
        assert!(Response::ok("").is_ok());
        assert!(!Response::synthesized(StatusCode::NOT_FOUND, "x").is_ok());
        assert!(!Response::new(StatusCode::MOVED_PERMANENTLY, Headers::new(), "").is_ok());
    }

    #[test]
    fn repeated_headers_are_all_kept() {
        let response = Response::ok("")
            .with_header(SET_COOKIE, HeaderValue::from_static("a=1"))
            .with_header(SET_COOKIE, HeaderValue::from_static("b=2"));
        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(response.clone(), response);
    }
}

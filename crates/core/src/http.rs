//! Transport-neutral request and response types.
//!
//! The engine never sees reqwest or axum types directly; the proxy and the
//! network client convert at their edges.

use bytes::Bytes;
use url::{Origin, Url};

/// A request captured for the duration of a single interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    /// Header pairs with lower-cased names, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl InterceptedRequest {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: Vec::new(), body: Bytes::new() }
    }

    /// Shorthand for a body-less GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Parse `url` and build a GET request for it.
    pub fn get_str(url: &str) -> Result<Self, crate::Error> {
        let url = Url::parse(url).map_err(|e| crate::Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::get(url))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    pub fn origin(&self) -> Origin {
        self.url.origin()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A fully buffered HTTP response.
///
/// The body is `Bytes`, so cloning a response to both return and store it
/// shares the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Empty 503 used as the terminal answer when every fallback misses.
    pub fn service_unavailable() -> Self {
        Self::new(503, Bytes::new())
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

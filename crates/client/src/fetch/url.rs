//! Request-target resolution for intercepted requests.
//!
//! A proxy sees either an absolute-form target (`GET http://host/path`) or an
//! origin-form target (`GET /path` plus a `Host` header). Both are turned
//! into one absolute URL so classification can compare origins.

/// Error type for request-target resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty request target")]
    Empty,

    #[error("missing Host header for origin-form target {0}")]
    MissingHost(String),

    #[error("authority-form target {0} is only valid for CONNECT")]
    AuthorityForm(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target to an absolute URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Origin-form targets are joined onto `default_scheme://host`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve_target(target: &str, host: Option<&str>, default_scheme: &str) -> Result<url::Url, UrlError> {
    let trimmed = target.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UrlError::MissingHost(trimmed.to_string()))?;
        if !trimmed.starts_with('/') {
            return Err(UrlError::AuthorityForm(trimmed.to_string()));
        }
        format!("{default_scheme}://{host}{trimmed}")
    };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Sends requests for a public origin to the upstream that serves it.
///
/// Only scheme, host and port change; path and query are kept.
#[derive(Debug, Clone)]
pub struct OriginRewrite {
    from: url::Origin,
    to: url::Url,
}

impl OriginRewrite {
    pub fn new(from: &url::Url, to: url::Url) -> Self {
        Self { from: from.origin(), to }
    }

    /// The upstream URL for `url`, or `None` when `url` is not on the
    /// rewritten origin.
    pub fn apply(&self, url: &url::Url) -> Option<url::Url> {
        if url.origin() != self.from {
            return None;
        }
        let mut target = url.clone();
        target.set_scheme(self.to.scheme()).ok()?;
        target.set_host(self.to.host_str()).ok()?;
        target.set_port(self.to.port()).ok()?;
        Some(target)
    }
}

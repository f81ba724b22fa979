//! Upstream HTTP fetch.
//!
//! `Network` is the seam between the interception engine and the real
//! network. A fetch either yields a response (any status) or a
//! `FetchError`, which the engine treats as "offline" for that request.
//!
//! - One attempt per request, no retries
//! - Redirects: up to 5
//! - Hop-by-hop headers are dropped in both directions
//! - Every upstream request carries `Via: 1.1 pantry-proxy` so a request
//!   that loops back into the proxy can be recognised
//! - Requests for the app origin are sent to the configured upstream

pub mod error;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use url::{OriginRewrite, UrlError, resolve_target};

use pantry_core::config::ConfigError;
use pantry_core::{AppConfig, HttpResponse, InterceptedRequest};

/// Pseudonym this proxy adds to `Via`.
pub const VIA_PSEUDONYM: &str = "pantry-proxy";

const VIA_VALUE: &str = "1.1 pantry-proxy";

/// Whether a `Via` header value shows the request already passed through
/// this proxy.
pub fn is_own_via(value: &str) -> bool {
    value.split(',').any(|hop| hop.split_whitespace().nth(1) == Some(VIA_PSEUDONYM))
}

/// Headers that describe a single connection and must not be forwarded.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// How an upstream request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Forward the request as captured.
    #[default]
    Default,
    /// Cross-origin request on behalf of the application: an `Origin`
    /// header naming the application is added when the request lacks one.
    Cors,
}

/// Anything that can perform an upstream fetch.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest, mode: RequestMode) -> Result<HttpResponse, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pantry-offline/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin sent with CORS-mode requests.
    pub app_origin: Option<String>,

    /// Where app-origin requests are really sent.
    pub upstream: Option<OriginRewrite>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "pantry-offline/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            app_origin: None,
            upstream: None,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let upstream = OriginRewrite::new(&config.app_origin_url()?, config.app_upstream_url()?);
        Ok(Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            app_origin: Some(config.app_origin.trim_end_matches('/').to_string()),
            upstream: Some(upstream),
            ..Default::default()
        })
    }
}

/// reqwest-backed `Network`.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn build(&self, request: &InterceptedRequest, mode: RequestMode) -> Result<reqwest::Request, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("method {}: {e}", request.method)))?;

        let target = self
            .config
            .upstream
            .as_ref()
            .and_then(|rewrite| rewrite.apply(&request.url))
            .unwrap_or_else(|| request.url.clone());

        let mut builder = self.http.request(method, target);
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder = builder.header(header::VIA, VIA_VALUE);

        if mode == RequestMode::Cors
            && request.header("origin").is_none()
            && let Some(origin) = &self.config.app_origin
        {
            builder = builder.header(header::ORIGIN, origin.as_str());
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        builder.build().map_err(FetchError::from)
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &InterceptedRequest, mode: RequestMode) -> Result<HttpResponse, FetchError> {
        let start = Instant::now();
        let upstream = self.build(request, mode)?;
        if upstream.url() != &request.url {
            tracing::debug!(url = %request.url, upstream = %upstream.url(), "routing to app upstream");
        }

        let response = self.http.execute(upstream).await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig { app_origin: Some("http://localhost:8080".into()), ..Default::default() })
            .unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "pantry-offline/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert!(config.app_origin.is_none());
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let config = FetchConfig::from_app_config(&AppConfig::default()).unwrap();
        assert_eq!(config.app_origin.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.timeout, Duration::from_millis(20_000));
        assert!(config.upstream.is_some());
    }

    #[test]
    fn test_own_via_detection() {
        assert!(is_own_via("1.1 pantry-proxy"));
        assert!(is_own_via("1.0 corp-gw, 1.1 pantry-proxy"));
        assert!(!is_own_via("1.1 varnish"));
        assert!(!is_own_via("1.1 pantry-proxy-staging"));
    }

    #[tokio::test]
    async fn test_build_marks_via() {
        let req = InterceptedRequest::get_str("https://localhost:3100/api/grocery/items")
            .unwrap()
            .with_header("Via", "1.0 corp-gw");
        let built = client().build(&req, RequestMode::Default).unwrap();
        let via: Vec<&str> = built.headers().get_all(header::VIA).iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(via, vec!["1.0 corp-gw", "1.1 pantry-proxy"]);
    }

    #[tokio::test]
    async fn test_build_routes_app_origin_to_upstream() {
        let client = FetchClient::new(FetchConfig::from_app_config(&AppConfig::default()).unwrap()).unwrap();

        let page = InterceptedRequest::get_str("http://localhost:8080/cart?x=1").unwrap();
        let built = client.build(&page, RequestMode::Default).unwrap();
        assert_eq!(built.url().as_str(), "http://127.0.0.1:3000/cart?x=1");

        let api = InterceptedRequest::get_str("https://localhost:3100/api/grocery/items").unwrap();
        let built = client.build(&api, RequestMode::Default).unwrap();
        assert_eq!(built.url().as_str(), "https://localhost:3100/api/grocery/items");
    }

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("host"));
        assert!(!is_hop_by_hop("accept"));
    }

    #[tokio::test]
    async fn test_build_drops_hop_by_hop_headers() {
        let req = InterceptedRequest::get_str("https://localhost:3100/api/grocery/items")
            .unwrap()
            .with_header("Accept", "application/json")
            .with_header("Connection", "keep-alive")
            .with_header("Host", "localhost:3100");
        let built = client().build(&req, RequestMode::Default).unwrap();

        assert_eq!(built.headers().get("accept").unwrap(), "application/json");
        assert!(built.headers().get("connection").is_none());
        assert!(built.headers().get(header::ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_build_cors_adds_origin() {
        let req = InterceptedRequest::get_str("https://localhost:3100/images/42.png").unwrap();
        let built = client().build(&req, RequestMode::Cors).unwrap();
        assert_eq!(built.headers().get(header::ORIGIN).unwrap(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_build_rejects_bad_method() {
        let req = InterceptedRequest::new("BAD METHOD", ::url::Url::parse("https://example.com").unwrap());
        let result = client().build(&req, RequestMode::Default);
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }
}

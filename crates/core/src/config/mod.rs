//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PANTRY_*)
//! 2. TOML config file (if PANTRY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::store::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Categories that ship a placeholder image.
pub const DEFAULT_FALLBACK_CATEGORIES: [&str; 8] =
    ["grocery", "bakery", "dairy", "frozen", "fruit", "herbs", "meat", "vegetables"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PANTRY_*)
/// 2. TOML config file (if PANTRY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite storage database.
    ///
    /// Set via PANTRY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket address the proxy listens on.
    ///
    /// Set via PANTRY_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origin the browser sees for the application. Usually the proxy's own
    /// address.
    ///
    /// Set via PANTRY_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Where requests for `app_origin` are actually fetched from. Must not
    /// point back at `listen_addr`.
    ///
    /// Set via PANTRY_APP_UPSTREAM environment variable.
    #[serde(default = "default_app_upstream")]
    pub app_upstream: String,

    /// Origin of the catalog API.
    ///
    /// Set via PANTRY_API_ORIGIN environment variable.
    #[serde(default = "default_api_origin")]
    pub api_origin: String,

    /// Path of the application shell inside the precache.
    ///
    /// Set via PANTRY_SHELL_PATH environment variable.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Base URL that fallback images (`fallback-{category}.png`) live under.
    ///
    /// Set via PANTRY_IMAGE_BASE_URL environment variable.
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// URL returning the full catalog as `{ "data": [...] }`.
    ///
    /// Set via PANTRY_CATALOG_URL environment variable.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Categories with a placeholder image.
    ///
    /// Set via PANTRY_FALLBACK_CATEGORIES environment variable.
    #[serde(default = "default_fallback_categories")]
    pub fallback_categories: Vec<String>,

    /// Category whose image is served when a record cannot be resolved.
    ///
    /// Set via PANTRY_GENERIC_CATEGORY environment variable.
    #[serde(default = "default_generic_category")]
    pub generic_category: String,

    /// Static assets to precache, relative to the app origin.
    /// The shell path is always precached in addition to these.
    ///
    /// Set via PANTRY_PRECACHE_URLS environment variable.
    #[serde(default)]
    pub precache_urls: Vec<String>,

    /// Version tag of the precache partition. Bumping it retires the
    /// previous precache on the next activation.
    ///
    /// Set via PANTRY_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// User-Agent string for upstream requests.
    ///
    /// Set via PANTRY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via PANTRY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pantry-offline.sqlite")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_app_origin() -> String {
    "http://localhost:8080".into()
}

fn default_app_upstream() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_api_origin() -> String {
    "https://localhost:3100".into()
}

fn default_shell_path() -> String {
    "/".into()
}

fn default_image_base_url() -> String {
    "https://localhost:3100/images".into()
}

fn default_catalog_url() -> String {
    "https://localhost:3100/api/grocery/items?limit=99999".into()
}

fn default_fallback_categories() -> Vec<String> {
    DEFAULT_FALLBACK_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_generic_category() -> String {
    "grocery".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_user_agent() -> String {
    "pantry-offline/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            app_origin: default_app_origin(),
            app_upstream: default_app_upstream(),
            api_origin: default_api_origin(),
            shell_path: default_shell_path(),
            image_base_url: default_image_base_url(),
            catalog_url: default_catalog_url(),
            fallback_categories: default_fallback_categories(),
            generic_category: default_generic_category(),
            precache_urls: Vec::new(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Partition names for the configured cache version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(self.cache_version)
    }

    pub fn app_origin_url(&self) -> Result<Url, ConfigError> {
        parse_url("app_origin", &self.app_origin)
    }

    pub fn app_upstream_url(&self) -> Result<Url, ConfigError> {
        parse_url("app_upstream", &self.app_upstream)
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| ConfigError::Invalid {
            field: "listen_addr".into(),
            reason: format!("{}: {e}", self.listen_addr),
        })
    }

    pub fn api_origin_url(&self) -> Result<Url, ConfigError> {
        parse_url("api_origin", &self.api_origin)
    }

    pub fn catalog_url(&self) -> Result<Url, ConfigError> {
        parse_url("catalog_url", &self.catalog_url)
    }

    /// Absolute URL of the application shell.
    pub fn shell_url(&self) -> Result<Url, ConfigError> {
        self.resolve_app_url("shell_path", &self.shell_path)
    }

    /// URL of the placeholder image for a (lower-case) category.
    pub fn fallback_image_url(&self, category: &str) -> Result<Url, ConfigError> {
        fallback_image_url(&self.image_base_url, category)
    }

    /// Every URL the precache partition should hold, shell first, without
    /// duplicates.
    pub fn precache_url_list(&self) -> Result<Vec<Url>, ConfigError> {
        let mut urls = vec![self.shell_url()?];
        for entry in &self.precache_urls {
            let url = self.resolve_app_url("precache_urls", entry)?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    fn resolve_app_url(&self, field: &str, path: &str) -> Result<Url, ConfigError> {
        self.app_origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PANTRY_`
    /// 2. TOML file from `PANTRY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PANTRY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PANTRY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// `{base}/fallback-{category}.png`, the key a category placeholder is
/// stored under.
pub fn fallback_image_url(image_base_url: &str, category: &str) -> Result<Url, ConfigError> {
    let base = image_base_url.trim_end_matches('/');
    parse_url("image_base_url", &format!("{base}/fallback-{category}.png"))
}

/// Whether a request for `url` would arrive back at a proxy bound to
/// `listen`. Only loopback names and literal addresses are recognised.
pub fn targets_listener(url: &Url, listen: SocketAddr) -> bool {
    if url.port_or_known_default() != Some(listen.port()) {
        return false;
    }

    let bound = listen.ip();
    let ip = match url.host() {
        Some(Host::Domain(domain)) => {
            return domain.eq_ignore_ascii_case("localhost") && (bound.is_loopback() || bound.is_unspecified());
        }
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
        None => return false,
    };
    ip == bound || bound.is_unspecified() || (ip.is_loopback() && bound.is_loopback())
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{value}: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./pantry-offline.sqlite"));
        assert_eq!(config.api_origin, "https://localhost:3100");
        assert_eq!(config.shell_path, "/");
        assert_eq!(config.fallback_categories.len(), 8);
        assert_eq!(config.generic_category, "grocery");
        assert_eq!(config.cache_version, 1);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.precache_urls.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_fallback_image_url() {
        let config = AppConfig { image_base_url: "https://localhost:3100/images/".into(), ..Default::default() };
        let url = config.fallback_image_url("dairy").unwrap();
        assert_eq!(url.as_str(), "https://localhost:3100/images/fallback-dairy.png");
    }

    #[test]
    fn test_shell_url_resolves_against_app_origin() {
        let config = AppConfig::default();
        assert_eq!(config.shell_url().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_precache_list_includes_shell_once() {
        let config = AppConfig {
            precache_urls: vec!["/".into(), "/app.js".into(), "/styles.css".into()],
            ..Default::default()
        };
        let urls = config.precache_url_list().unwrap();
        let paths: Vec<&str> = urls.iter().map(|u| u.path()).collect();
        assert_eq!(paths, vec!["/", "/app.js", "/styles.css"]);
    }

    #[test]
    fn test_default_upstream_is_not_the_listener() {
        let config = AppConfig::default();
        let listen = config.listen_socket_addr().unwrap();
        assert!(targets_listener(&config.app_origin_url().unwrap(), listen));
        assert!(!targets_listener(&config.app_upstream_url().unwrap(), listen));
        assert!(!targets_listener(&config.api_origin_url().unwrap(), listen));
    }

    #[test]
    fn test_targets_listener() {
        let loopback: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let any: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let lan: SocketAddr = "192.168.1.5:8080".parse().unwrap();
        let url = |s: &str| Url::parse(s).unwrap();

        assert!(targets_listener(&url("http://localhost:8080/"), loopback));
        assert!(targets_listener(&url("http://127.0.0.1:8080/cart"), loopback));
        assert!(targets_listener(&url("http://[::1]:8080/"), loopback));
        assert!(targets_listener(&url("http://192.168.1.5:8080/"), any));
        assert!(!targets_listener(&url("http://localhost:8081/"), loopback));
        assert!(!targets_listener(&url("http://127.0.0.1:8080/"), lan));
        assert!(!targets_listener(&url("http://app.internal:8080/"), loopback));
        assert!(!targets_listener(&url("http://localhost/"), loopback));
    }

    #[test]
    fn test_cache_names_follow_version() {
        let config = AppConfig { cache_version: 3, ..Default::default() };
        assert!(config.cache_names().is_current("precache-v3"));
    }
}

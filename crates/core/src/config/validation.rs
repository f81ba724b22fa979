//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, targets_listener};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any origin or URL field does not parse
    /// - `shell_path` is not absolute
    /// - `cache_version` is 0
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `generic_category` is not one of `fallback_categories` (compared
    ///   case-insensitively)
    /// - `listen_addr` is not a socket address
    /// - `app_upstream` or `api_origin` points back at `listen_addr`
    ///
    /// Returns `ConfigError::Missing` if `fallback_categories` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app_origin_url()?;
        let listen = self.listen_socket_addr()?;
        for (field, url) in [("app_upstream", self.app_upstream_url()?), ("api_origin", self.api_origin_url()?)] {
            if targets_listener(&url, listen) {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("{url} points back at listen_addr {listen}"),
                });
            }
        }
        self.catalog_url()?;
        self.fallback_image_url(&self.generic_category)?;

        if !self.shell_path.starts_with('/') {
            return Err(ConfigError::Invalid { field: "shell_path".into(), reason: "must start with '/'".into() });
        }
        self.precache_url_list()?;

        if self.cache_version == 0 {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must be at least 1".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.fallback_categories.is_empty() {
            return Err(ConfigError::Missing {
                field: "fallback_categories".into(),
                hint: "Set PANTRY_FALLBACK_CATEGORIES or list them in the config file".into(),
            });
        }
        if !self
            .fallback_categories
            .iter()
            .any(|c| c.to_lowercase() == self.generic_category.to_lowercase())
        {
            return Err(ConfigError::Invalid {
                field: "generic_category".into(),
                reason: format!("{} is not a fallback category", self.generic_category),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_api_origin() {
        let config = AppConfig { api_origin: "localhost 3100".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_origin"));
    }

    #[test]
    fn test_validate_relative_shell_path() {
        let config = AppConfig { shell_path: "index.html".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "shell_path"));
    }

    #[test]
    fn test_validate_cache_version_zero() {
        let config = AppConfig { cache_version: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_no_categories() {
        let config = AppConfig { fallback_categories: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "fallback_categories"));
    }

    #[test]
    fn test_validate_generic_category_must_be_listed() {
        let config = AppConfig { generic_category: "candy".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "generic_category"));
    }

    #[test]
    fn test_validate_generic_category_ignores_case() {
        let config = AppConfig {
            fallback_categories: vec!["Grocery".into(), "Dairy".into()],
            generic_category: "GROCERY".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_upstream_pointing_at_listener() {
        let config = AppConfig { app_upstream: "http://localhost:8080".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "app_upstream"));
    }

    #[test]
    fn test_validate_api_origin_pointing_at_listener() {
        let config = AppConfig {
            listen_addr: "0.0.0.0:3100".into(),
            app_origin: "http://localhost:3100".into(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_origin"));
    }

    #[test]
    fn test_validate_bad_listen_addr() {
        let config = AppConfig { listen_addr: "localhost".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "listen_addr"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, cache_version: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}

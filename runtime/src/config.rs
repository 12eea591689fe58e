//! Configuration for the storefront runtime.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Values that are present but unparsable fall back to the default.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/weblarek";
/// Default image CDN base URL
pub const DEFAULT_CDN_URL: &str = "http://localhost:3000/content/weblarek";
/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Shop backend base URL (`STOREFRONT_API_URL`)
    pub api_url: String,
    /// Prefix for relative product image paths (`STOREFRONT_CDN_URL`)
    pub cdn_url: String,
    /// HTTP request timeout in seconds (`STOREFRONT_REQUEST_TIMEOUT_SECS`)
    pub request_timeout_secs: u64,
    /// Log filter directive (`RUST_LOG`)
    pub log_level: String,
}

impl StorefrontConfig {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_url: lookup("STOREFRONT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            cdn_url: lookup("STOREFRONT_CDN_URL").unwrap_or_else(|| DEFAULT_CDN_URL.to_string()),
            request_timeout_secs: lookup("STOREFRONT_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// HTTP request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.cdn_url, DEFAULT_CDN_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STOREFRONT_API_URL", "https://shop.example.com/api"),
            ("STOREFRONT_CDN_URL", "https://cdn.example.com"),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", "5"),
            ("RUST_LOG", "debug"),
        ]);

        let config = StorefrontConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));
        assert_eq!(config.api_url, "https://shop.example.com/api");
        assert_eq!(config.cdn_url, "https://cdn.example.com");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unparsable_timeout_falls_back() {
        let config = StorefrontConfig::from_lookup(|key| {
            (key == "STOREFRONT_REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}

//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PWA_*)
//! 2. TOML config file (if PWA_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is compiled once into an immutable
//! [`ConfigSnapshot`] which is all the worker ever reads.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod snapshot;
mod validation;

pub use snapshot::{ConfigSnapshot, Strategy};
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PWA_*)
/// 2. TOML config file (if PWA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache version. Bumping it creates a new generation and evicts the old one.
    #[serde(default = "default_version")]
    pub version: u64,

    /// Prefix shared by every generation this worker owns.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin the worker is scoped to; relative URLs resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Regular expressions; a request URL matching any of them is never cached.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Pages warmed into the cache at install time.
    #[serde(default)]
    pub precache_urls: Vec<String>,

    /// Static assets warmed into the cache at install time.
    #[serde(default)]
    pub precache_asset_urls: Vec<String>,

    /// Strategy identifier for pages and API responses.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Page served when a navigation fails offline.
    #[serde(default = "default_offline_page_url")]
    pub offline_page_url: String,

    /// Image served when an image fetch fails offline.
    #[serde(default = "default_offline_image_url")]
    pub offline_image_url: String,

    /// Path of the endpoint that answers 200 while the host application exists.
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    /// Path to SQLite cache database.
    ///
    /// Set via PWA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Quiet period after which the worker counts as torn down and the
    /// liveness check re-arms.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn default_version() -> u64 {
    1
}

fn default_cache_prefix() -> String {
    "pwa-main-".into()
}

fn default_origin() -> String {
    "http://localhost".into()
}

fn default_strategy() -> String {
    "network_first".into()
}

fn default_offline_page_url() -> String {
    "/offline".into()
}

fn default_offline_image_url() -> String {
    "/offline-image.svg".into()
}

fn default_liveness_path() -> String {
    "/pwa/module-active".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pwa-cache.sqlite")
}

fn default_user_agent() -> String {
    "pwa-worker/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            exclude_patterns: Vec::new(),
            precache_urls: Vec::new(),
            precache_asset_urls: Vec::new(),
            strategy: default_strategy(),
            offline_page_url: default_offline_page_url(),
            offline_image_url: default_offline_image_url(),
            liveness_path: default_liveness_path(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PWA_`
    /// 2. TOML file from `PWA_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PWA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PWA_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.cache_prefix, "pwa-main-");
        assert_eq!(config.origin, "http://localhost");
        assert_eq!(config.strategy, "network_first");
        assert_eq!(config.offline_page_url, "/offline");
        assert_eq!(config.liveness_path, "/pwa/module-active");
        assert_eq!(config.db_path, PathBuf::from("./pwa-cache.sqlite"));
        assert_eq!(config.user_agent, "pwa-worker/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.exclude_patterns.is_empty());
        assert!(config.precache_urls.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.idle_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "pwa.toml",
                r#"
                version = 3
                strategy = "cache_first"
                precache_urls = ["/", "/about"]
                exclude_patterns = ["/admin"]
                "#,
            )?;
            jail.set_env("PWA_CONFIG_FILE", "pwa.toml");
            jail.set_env("PWA_VERSION", "4");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.version, 4);
            assert_eq!(config.strategy, "cache_first");
            assert_eq!(config.precache_urls, vec!["/".to_string(), "/about".to_string()]);
            assert_eq!(config.exclude_patterns, vec!["/admin".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PWA_VERSION", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
            Ok(())
        });
    }
}

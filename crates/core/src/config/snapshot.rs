//! Immutable, compiled view of the configuration.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use url::Url;

use super::{AppConfig, ConfigError};
use crate::http::strip_origin;

/// Caching strategy applied to pages and API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    StaleWhileRevalidate,
    NetworkFirst,
    CacheFirst,
    NetworkOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
            Strategy::NetworkFirst => "network_first",
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkOnly => "network_only",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    /// Accepts the snake_case names and the camelCase identifiers written by
    /// existing site configurations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stale_while_revalidate" | "staleWhileRevalidate" => Ok(Strategy::StaleWhileRevalidate),
            "network_first" | "networkCacheFallback" | "networkFirst" => Ok(Strategy::NetworkFirst),
            "cache_first" | "cacheNetworkFallback" | "cacheFirst" => Ok(Strategy::CacheFirst),
            "network_only" | "networkOnly" => Ok(Strategy::NetworkOnly),
            "" => Err(ConfigError::Missing { field: "strategy".into(), hint: "Set PWA_STRATEGY".into() }),
            other => Err(ConfigError::Invalid { field: "strategy".into(), reason: format!("unknown strategy: {other}") }),
        }
    }
}

/// Everything the worker needs, resolved and compiled.
///
/// Built once per deployment; nothing in the worker mutates it.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub cache_prefix: String,
    pub origin: Url,
    pub exclude_patterns: Vec<Regex>,
    pub precache_urls: Vec<Url>,
    pub precache_asset_urls: Vec<Url>,
    pub strategy: Strategy,
    pub offline_page_url: Url,
    pub offline_image_url: Url,
    pub liveness_url: Url,
    precache_paths: HashSet<String>,
}

impl ConfigSnapshot {
    /// Name of the current generation (`prefix + version`).
    pub fn current_generation(&self) -> String {
        format!("{}{}", self.cache_prefix, self.version)
    }

    /// True for generation names owned by this worker.
    pub fn owns_generation(&self, name: &str) -> bool {
        name.starts_with(&self.cache_prefix)
    }

    /// Pages and assets warmed at install, in configuration order.
    pub fn precache_all(&self) -> impl Iterator<Item = &Url> {
        self.precache_urls.iter().chain(self.precache_asset_urls.iter())
    }

    /// Whether a URL was listed for precaching.
    ///
    /// Same-origin entries compare by origin-stripped path (path plus
    /// query), cross-origin entries by their full URL.
    pub fn is_precached(&self, url: &Url) -> bool {
        self.precache_paths.contains(&strip_origin(url)) || self.precache_paths.contains(url.as_str())
    }

    pub fn is_excluded(&self, url: &Url) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(url.as_str()))
    }
}

fn resolve(origin: &Url, field: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = origin
        .join(raw.trim())
        .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{raw}: {e}") })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid { field: field.into(), reason: format!("{raw}: unsupported scheme") });
    }
    url.set_fragment(None);
    Ok(url)
}

impl AppConfig {
    /// Compile the configuration into a [`ConfigSnapshot`].
    ///
    /// Every failure here is a startup error: a bad pattern or an unknown
    /// strategy never reaches request handling.
    pub fn snapshot(&self) -> Result<ConfigSnapshot, ConfigError> {
        self.validate()?;

        let origin = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        let strategy: Strategy = self.strategy.parse()?;

        let exclude_patterns = self
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ConfigError::Invalid { field: "exclude_patterns".into(), reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let precache_urls = self
            .precache_urls
            .iter()
            .map(|u| resolve(&origin, "precache_urls", u))
            .collect::<Result<Vec<_>, _>>()?;
        let precache_asset_urls = self
            .precache_asset_urls
            .iter()
            .map(|u| resolve(&origin, "precache_asset_urls", u))
            .collect::<Result<Vec<_>, _>>()?;

        let precache_paths = precache_urls
            .iter()
            .chain(precache_asset_urls.iter())
            .map(|u| if u.origin() == origin.origin() { strip_origin(u) } else { u.to_string() })
            .collect();

        Ok(ConfigSnapshot {
            version: self.version,
            cache_prefix: self.cache_prefix.clone(),
            offline_page_url: resolve(&origin, "offline_page_url", &self.offline_page_url)?,
            offline_image_url: resolve(&origin, "offline_image_url", &self.offline_image_url)?,
            liveness_url: resolve(&origin, "liveness_path", &self.liveness_path)?,
            origin,
            exclude_patterns,
            precache_urls,
            precache_asset_urls,
            strategy,
            precache_paths,
        })
    }
}

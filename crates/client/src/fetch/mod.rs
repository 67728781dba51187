//! Network access for the worker.
//!
//! ### Fetch options
//! - Credentials: `Omit`, `SameOrigin` (default), `Include`. Cookies and
//!   authorization headers are only forwarded when the scope allows them.
//! - Mode: `Cors` (default) or `NoCors`. Cross-origin responses fetched in
//!   `NoCors` mode come back opaque: status 0, no headers.
//!
//! ### Failures
//! Any HTTP status is a response. Only transport errors, timeouts and
//! oversized bodies are [`NetworkError`]s; the caller decides what a
//! 404 or a redirect means.

pub mod url;

use async_trait::async_trait;
use pwa_core::{Headers, Request, Response, ResponseKind};
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use pwa_core::RequestMode;
pub use url::{UrlError, canonicalize};

/// Headers that carry credentials.
const CREDENTIAL_HEADERS: &[&str] = &["cookie", "authorization"];

/// Hop-by-hop headers never forwarded to the network.
const HOP_HEADERS: &[&str] = &["host", "connection", "content-length", "transfer-encoding"];

/// Which requests may carry credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Per-request network options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub credentials: Credentials,
    pub mode: RequestMode,
}

impl FetchOptions {
    /// Options for an intercepted request: same-origin credentials and the
    /// mode the request was issued with.
    pub fn for_request(request: &Request) -> Self {
        Self { credentials: Credentials::SameOrigin, mode: request.mode }
    }

    /// Options used when warming the cache: same-origin credentials,
    /// cross-origin responses accepted opaquely.
    pub fn precache() -> Self {
        Self { credentials: Credentials::SameOrigin, mode: RequestMode::NoCors }
    }

    /// Options for the single retry made when an opaque response cannot be
    /// judged: a readable CORS request without credentials.
    pub fn relaxed() -> Self {
        Self { credentials: Credentials::Omit, mode: RequestMode::Cors }
    }
}

/// No response could be obtained.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response too large: {0}")]
    TooLarge(String),

    #[error("network error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout(err.to_string())
        } else if err.is_connect() {
            NetworkError::Connect(err.to_string())
        } else {
            NetworkError::Other(err.to_string())
        }
    }
}

impl From<NetworkError> for pwa_core::Error {
    fn from(err: NetworkError) -> Self {
        pwa_core::Error::Network(err.to_string())
    }
}

/// The network as seen by the worker.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, NetworkError>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pwa-worker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin the worker is scoped to; decides same-origin credentials and
    /// which responses are opaque.
    pub origin: reqwest::Url,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "pwa-worker/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: reqwest::Url::parse("http://localhost").expect("static URL parses"),
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &pwa_core::AppConfig) -> Result<Self, pwa_core::Error> {
        let origin = reqwest::Url::parse(&config.origin).map_err(|e| pwa_core::Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin,
            ..Default::default()
        })
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, pwa_core::Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| pwa_core::Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn is_same_origin(&self, url: &reqwest::Url) -> bool {
        url.origin() == self.config.origin.origin()
    }

    /// Whether credentials may travel with a request to `url`.
    fn sends_credentials(&self, url: &reqwest::Url, credentials: Credentials) -> bool {
        match credentials {
            Credentials::Omit => false,
            Credentials::SameOrigin => self.is_same_origin(url),
            Credentials::Include => true,
        }
    }
}

/// Request headers to forward, minus hop-by-hop and disallowed credentials.
fn outgoing_headers(headers: &Headers, with_credentials: bool) -> header::HeaderMap {
    let mut map = header::HeaderMap::new();
    for (name, value) in headers.iter() {
        let lower = name.to_ascii_lowercase();
        if HOP_HEADERS.contains(&lower.as_str()) {
            continue;
        }
        if !with_credentials && CREDENTIAL_HEADERS.contains(&lower.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) =
            (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value))
        {
            map.append(name, value);
        }
    }
    map
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, NetworkError> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::Other(format!("invalid method {}: {e}", request.method)))?;

        let with_credentials = self.sends_credentials(&request.url, options.credentials);
        let response = self
            .http
            .request(method, request.url.clone())
            .headers(outgoing_headers(&request.headers, with_credentials))
            .send()
            .await?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await?;

        if bytes.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        if self.is_same_origin(&request.url) {
            return Ok(Response::new(final_url, status.as_u16(), headers, bytes, ResponseKind::Basic));
        }

        match options.mode {
            RequestMode::NoCors => Ok(Response::opaque(final_url, bytes)),
            RequestMode::Cors => Ok(Response::new(final_url, status.as_u16(), headers, bytes, ResponseKind::Cors)),
        }
    }
}

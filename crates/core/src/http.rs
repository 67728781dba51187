//! Request and response types exchanged with the host environment.
//!
//! The worker never sees transport-specific objects: hosts translate their
//! own request/response shapes into these before calling in.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Header carrying the reduced-data-usage signal.
pub const SAVE_DATA_HEADER: &str = "save-data";

/// The URL with its origin removed: path plus query.
pub fn strip_origin(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

/// Ordered list of header name/value pairs.
///
/// Lookups are case-insensitive; insertion order is preserved so a cached
/// response replays its headers the way they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// First value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Whether a cross-origin response may be read by the worker.
///
/// Subresources such as `<img>` and `<script>` without a `crossorigin`
/// attribute are requested in `NoCors` mode and come back opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    #[default]
    Cors,
    NoCors,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
    pub mode: RequestMode,
}

impl Request {
    /// A GET request with no headers.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, headers: Headers::new(), mode: RequestMode::Cors }
    }

    pub fn new(method: impl Into<String>, url: Url, headers: Headers) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, headers, mode: RequestMode::Cors }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// True when the client asked for reduced data usage (`Save-Data: on`).
    pub fn saves_data(&self) -> bool {
        self.headers
            .get(SAVE_DATA_HEADER)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("on"))
    }
}

/// How much of a response the worker may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Same-origin response; everything is visible.
    Basic,
    /// Cross-origin response fetched in CORS mode.
    Cors,
    /// Cross-origin response whose status and body cannot be introspected.
    Opaque,
    /// Generic network error.
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "cors" => Some(ResponseKind::Cors),
            "opaque" => Some(ResponseKind::Opaque),
            "error" => Some(ResponseKind::Error),
            _ => None,
        }
    }
}

/// A response handed back to the host.
///
/// `body` is reference counted, so cloning a response to both cache it and
/// return it does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Option<Url>,
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl Response {
    pub fn new(url: Url, status: u16, headers: Headers, body: impl Into<Bytes>, kind: ResponseKind) -> Self {
        Self { url: Some(url), status, headers, body: body.into(), kind }
    }

    /// The generic network-error response returned when nothing else is available.
    pub fn network_error() -> Self {
        Self { url: None, status: 0, headers: Headers::new(), body: Bytes::new(), kind: ResponseKind::Error }
    }

    /// An opaque response: status and headers hidden from the worker.
    pub fn opaque(url: Url, body: impl Into<Bytes>) -> Self {
        Self { url: Some(url), status: 0, headers: Headers::new(), body: body.into(), kind: ResponseKind::Opaque }
    }

    pub fn is_opaque(&self) -> bool {
        self.kind == ResponseKind::Opaque
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// 2xx with an inspectable status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only inspectable success responses are ever written by a strategy.
    /// Redirects and errors are returned to the caller but never cached.
    pub fn is_cacheable(&self) -> bool {
        matches!(self.kind, ResponseKind::Basic | ResponseKind::Cors) && self.ok()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

//! sw_fetch tool implementation.
//!
//! Delivers an intercepted request to the worker and reports how it was
//! answered.

use std::collections::BTreeMap;

use pwa_client::fetch::canonicalize;
use pwa_client::worker::{FetchDecision, Worker};
use pwa_core::{Error, Headers, Request, RequestMode, Response};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request headers, e.g. {"Save-Data": "on"}.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Request mode: "cors" (default) or "no-cors".
    #[serde(default)]
    pub mode: Option<RequestMode>,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// "respond" or "passthrough".
    pub decision: String,
    /// Why the worker did not handle the request.
    pub passthrough: Option<String>,
    /// network, cache, offline or network_error.
    pub source: Option<String>,
    pub status: Option<u16>,
    pub kind: Option<String>,
    pub headers: Option<Headers>,
    /// Body as text for textual content types.
    pub body: Option<String>,
    pub body_bytes: usize,
}

fn is_textual(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.starts_with("text/") || ["json", "xml", "javascript", "svg"].iter().any(|t| ct.contains(t))
    })
}

fn respond_output(url: String, source: &str, response: &Response) -> SwFetchOutput {
    let body = is_textual(response.content_type()).then(|| String::from_utf8_lossy(&response.body).into_owned());
    SwFetchOutput {
        url,
        decision: "respond".into(),
        passthrough: None,
        source: Some(source.to_string()),
        status: Some(response.status),
        kind: Some(response.kind.as_str().to_string()),
        headers: Some(response.headers.clone()),
        body,
        body_bytes: response.body.len(),
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &worker.snapshot().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let headers: Headers = params.headers.unwrap_or_default().into_iter().collect();
    let method = params.method.unwrap_or_else(|| "GET".into());
    if method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let request = Request::new(method, url, headers).with_mode(params.mode.unwrap_or_default());

    let output = match worker.fetch(&request).await {
        FetchDecision::Respond(outcome) => {
            respond_output(request.url.to_string(), outcome.source.as_str(), &outcome.response)
        }
        FetchDecision::Passthrough(reason) => SwFetchOutput {
            url: request.url.to_string(),
            decision: "passthrough".into(),
            passthrough: Some(reason.as_str().to_string()),
            source: None,
            status: None,
            kind: None,
            headers: None,
            body: None,
            body_bytes: 0,
        },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, worker};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.to_string(), method: None, headers: None, mode: None }
    }

    #[tokio::test]
    async fn test_fetch_before_activate_passes_through() {
        let (worker, _) = worker().await;
        let result = fetch_impl(&worker, params("/")).await.unwrap();
        let out = output(&result);
        assert_eq!(out["decision"], "passthrough");
        assert_eq!(out["passthrough"], "not_controlling");
    }

    #[tokio::test]
    async fn test_fetch_offline_fallback() {
        let (worker, _) = worker().await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let result = fetch_impl(&worker, params("/node/1")).await.unwrap();
        let out = output(&result);
        assert_eq!(out["decision"], "respond");
        assert_eq!(out["source"], "offline");
        assert_eq!(out["body"], "<h1>Offline</h1>");
    }

    #[tokio::test]
    async fn test_fetch_binary_body_reported_as_size() {
        let (worker, _) = worker().await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let result = fetch_impl(&worker, params("https://example.com/logo.png")).await.unwrap();
        let out = output(&result);
        assert_eq!(out["source"], "cache");
        assert!(out["body"].is_null());
        assert_eq!(out["body_bytes"], 5);
    }

    #[tokio::test]
    async fn test_fetch_excluded() {
        let (worker, _) = worker().await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let mut p = params("/admin/people");
        p.method = Some("post".into());
        let out = output(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(out["passthrough"], "excluded");
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_url() {
        let (worker, _) = worker().await;
        assert!(fetch_impl(&worker, params("ftp://example.com/file")).await.is_err());
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual(Some("text/html; charset=utf-8")));
        assert!(is_textual(Some("application/json")));
        assert!(is_textual(Some("image/svg+xml")));
        assert!(!is_textual(Some("image/png")));
        assert!(!is_textual(None));
    }
}

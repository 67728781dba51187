//! cache_match tool implementation.
//!
//! Looks a URL up in the current generation without touching the network.

use pwa_client::fetch::canonicalize;
use pwa_client::worker::Worker;
use pwa_core::{Error, Headers, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the worker's origin.
    pub url: String,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub generation: String,
    pub url: String,
    pub status: u16,
    pub kind: String,
    pub headers: Headers,
    pub body_bytes: usize,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &Worker, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &worker.snapshot().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let generation = worker.current_generation();

    let response = generation
        .lookup(&Request::get(url.clone()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheMatchOutput {
        generation: generation.name().to_string(),
        url: url.to_string(),
        status: response.status,
        kind: response.kind.as_str().to_string(),
        headers: response.headers,
        body_bytes: response.body.len(),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, worker};

    #[tokio::test]
    async fn test_match_missing() {
        let (worker, _) = worker().await;
        let params = CacheMatchParams { url: "/".to_string() };

        let err = match_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_match_found() {
        let (worker, _) = worker().await;
        worker.install().await.unwrap();

        let params = CacheMatchParams { url: "https://EXAMPLE.com/offline#top".to_string() };
        let out = output(&match_impl(&worker, params).await.unwrap());
        assert_eq!(out["generation"], "pwa-main-1");
        assert_eq!(out["url"], "https://example.com/offline");
        assert_eq!(out["status"], 200);
        assert_eq!(out["kind"], "basic");
    }
}

//! cache_delete tool implementation.
//!
//! Deletes one generation by name, owned or not.

use pwa_client::worker::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Generation name, e.g. "pwa-main-1".
    pub name: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub name: String,
    /// False if no generation had that name.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(worker: &Worker, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(ToolError::InvalidInput("name cannot be empty".into()).into());
    }

    let deleted = worker.store().delete(name).await?;
    if deleted {
        tracing::info!(generation = %name, "generation deleted on request");
    }

    json_result(&CacheDeleteOutput { name: name.to_string(), deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, worker};

    #[tokio::test]
    async fn test_delete_generation() {
        let (worker, _) = worker().await;
        worker.store().create("custom-cache").await.unwrap();

        let out = output(&delete_impl(&worker, CacheDeleteParams { name: "custom-cache".into() }).await.unwrap());
        assert_eq!(out["deleted"], true);

        let out = output(&delete_impl(&worker, CacheDeleteParams { name: "custom-cache".into() }).await.unwrap());
        assert_eq!(out["deleted"], false);
        assert!(worker.store().keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_name() {
        let (worker, _) = worker().await;
        assert!(delete_impl(&worker, CacheDeleteParams { name: "  ".into() }).await.is_err());
    }
}

//! MCP tool implementations.
//!
//! `sw_*` tools deliver the host's lifecycle and fetch signals to the
//! worker; `cache_*` tools inspect and prune the cache store.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Render a tool output as pretty JSON text.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Serialization(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use pwa_client::{FetchOptions, Network, NetworkError, Worker};
    use pwa_core::{AppConfig, CacheDb, CacheStore, Headers, Request, Response, ResponseKind};
    use rmcp::model::CallToolResult;

    use crate::registration::HostRegistration;

    /// Serves fixed bodies for known URLs; everything else is unreachable.
    pub struct StaticNetwork(pub HashMap<String, (u16, &'static str, &'static str)>);

    #[async_trait]
    impl Network for StaticNetwork {
        async fn fetch(&self, request: &Request, _options: FetchOptions) -> Result<Response, NetworkError> {
            match self.0.get(request.url.as_str()) {
                Some((status, content_type, body)) => {
                    let headers: Headers = [("Content-Type", *content_type)].into_iter().collect();
                    Ok(Response::new(request.url.clone(), *status, headers, *body, ResponseKind::Basic))
                }
                None => Err(NetworkError::Connect(request.url.to_string())),
            }
        }
    }

    pub async fn worker() -> (Arc<Worker>, Arc<HostRegistration>) {
        let snapshot = AppConfig {
            origin: "https://example.com".into(),
            precache_urls: vec!["/".into(), "/offline".into()],
            precache_asset_urls: vec!["/logo.png".into()],
            exclude_patterns: vec!["/admin".into()],
            ..Default::default()
        }
        .snapshot()
        .unwrap();

        let network = StaticNetwork(HashMap::from([
            ("https://example.com/".to_string(), (200, "text/html", "<h1>Home</h1>")),
            ("https://example.com/offline".to_string(), (200, "text/html", "<h1>Offline</h1>")),
            ("https://example.com/logo.png".to_string(), (200, "image/png", "\u{89}PNG")),
            ("https://example.com/pwa/module-active".to_string(), (200, "text/plain", "")),
        ]));
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let registration = Arc::new(HostRegistration::default());
        let worker = Worker::new(
            Arc::new(snapshot),
            store,
            Arc::new(network),
            registration.clone(),
            Duration::from_secs(60),
        );
        (Arc::new(worker), registration)
    }

    /// Parse the JSON text of a tool result.
    pub fn output(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("text content");
        serde_json::from_str(text).unwrap()
    }
}

//! sw_install and sw_activate tool implementations.

use pwa_client::worker::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Create the current generation and precache the configured URLs.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&report)
}

/// Evict superseded generations and start controlling requests.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}

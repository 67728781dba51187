//! sw_status tool implementation.

use pwa_client::worker::{Worker, WorkerStatus};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use super::json_result;
use crate::registration::HostRegistration;

#[derive(Debug, Serialize)]
pub struct SwStatusOutput {
    #[serde(flatten)]
    pub worker: WorkerStatus,
    pub registered: bool,
    pub current_generation: String,
}

pub async fn status_impl(worker: &Worker, registration: &HostRegistration) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput {
        worker: worker.status().await?,
        registered: registration.is_registered(),
        current_generation: worker.snapshot().current_generation(),
    };
    json_result(&output)
}

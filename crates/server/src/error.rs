//! Errors raised by the tool layer itself, before or after the worker runs.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Malformed tool arguments (bad header name, empty generation name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool result could not be rendered as JSON.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialization(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Serialization(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let err: McpError = ToolError::InvalidInput("empty name".into()).into();
        assert_eq!(err.code.0, -32602);
        assert_eq!(err.message, "empty name");

        let err: McpError = ToolError::Serialization("boom".into()).into();
        assert_eq!(err.code.0, -32603);
    }
}

//! MCP error types

use armature_core::ToolError;
use std::time::Duration;
use thiserror::Error;

/// MCP operation result type
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while talking to an MCP server
#[derive(Debug, Error)]
pub enum McpError {
    /// Missing or invalid construction parameters
    #[error("{0}")]
    Config(String),

    /// Server answered with a non-success status
    #[error("HTTP error {status}: {reason} (response: {body})")]
    Http {
        status: u16,
        reason: String,
        body: String,
    },

    /// Request could not be sent or the body could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected response
    #[error("{0}")]
    Protocol(String),

    /// Event stream closed before a full JSON-RPC response arrived
    #[error("SSE stream ended without complete message")]
    SseIncomplete,

    /// Reading an event stream took longer than allowed
    #[error("timeout reading SSE response after {}", format_duration(.0))]
    SseTimeout(Duration),

    /// JSON-RPC `error` object in the response
    #[error("MCP error: {message}")]
    JsonRpc { code: i64, message: String },

    /// Envelope succeeded but the payload signals a tool failure
    #[error("MCP tool error: {0}")]
    ToolReported(String),

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,
}

fn format_duration(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

impl McpError {
    pub fn protocol(message: impl Into<String>) -> Self {
        McpError::Protocol(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        McpError::Transport(message.into())
    }

    /// Build the error for a JSON-RPC error object.
    ///
    /// Servers sometimes send an empty message; the code is reported instead.
    pub fn json_rpc(code: i64, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("MCP protocol error (code: {})", code);
        }
        McpError::JsonRpc { code, message }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            McpError::Transport(_) | McpError::SseTimeout(_) => true,
            McpError::Http { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Get the error code suitable for logging or reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            McpError::Config(_) => "CONFIG_ERROR",
            McpError::Http { .. } => "HTTP_ERROR",
            McpError::Transport(_) => "TRANSPORT_ERROR",
            McpError::Protocol(_) => "PROTOCOL_ERROR",
            McpError::SseIncomplete => "SSE_INCOMPLETE",
            McpError::SseTimeout(_) => "SSE_TIMEOUT",
            McpError::JsonRpc { .. } => "JSON_RPC_ERROR",
            McpError::ToolReported(_) => "TOOL_ERROR",
            McpError::Cancelled => "CANCELLED",
        }
    }

    /// Convert into the tool-level error reported for `tool`.
    pub fn into_tool_error(self, tool: &str) -> ToolError {
        match self {
            McpError::Cancelled => ToolError::cancelled(tool),
            other => ToolError::execution_failed(tool, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_includes_body() {
        let err = McpError::Http {
            status: 502,
            reason: "Bad Gateway".into(),
            body: "upstream down".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 502: Bad Gateway (response: upstream down)"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn json_rpc_falls_back_to_code() {
        assert_eq!(
            McpError::json_rpc(-32601, "").to_string(),
            "MCP error: MCP protocol error (code: -32601)"
        );
        assert_eq!(
            McpError::json_rpc(-32602, "bad params").to_string(),
            "MCP error: bad params"
        );
    }

    #[test]
    fn sse_timeout_is_human_readable() {
        let err = McpError::SseTimeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "timeout reading SSE response after 5m");
    }

    #[test]
    fn converts_into_tool_errors() {
        let err = McpError::ToolReported("disk full".into()).into_tool_error("write");
        assert_eq!(err.to_string(), "MCP tool error: disk full");
        assert_eq!(err.tool_name(), "write");

        let err = McpError::Cancelled.into_tool_error("write");
        assert!(matches!(err, ToolError::Cancelled { .. }));
    }
}

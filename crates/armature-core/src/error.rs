//! Tool execution errors.

use thiserror::Error;

use crate::result::ToolResult;

/// Errors raised while executing or describing a tool.
///
/// Every variant names the tool it concerns so the error can be turned into a
/// failed [`ToolResult`] with [`ToolError::to_tool_result`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// No tool with this name is registered.
    #[error("{}", not_found_message(.tool, .available))]
    NotFound {
        tool: String,
        available: Vec<String>,
    },

    /// Arguments failed client-side validation.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The tool ran and failed.
    #[error("{message}")]
    ExecutionFailed { tool: String, message: String },

    /// The tool did not finish in time.
    #[error("Tool '{tool}' timed out after {duration_ms}ms")]
    Timeout { tool: String, duration_ms: u64 },

    /// The caller cancelled the execution.
    #[error("Tool '{tool}' execution was cancelled")]
    Cancelled { tool: String },

    /// The tool's descriptor breaks a schema invariant.
    #[error("Invalid descriptor for tool '{tool}': {reason}")]
    InvalidDescriptor { tool: String, reason: String },
}

fn not_found_message(tool: &str, available: &[String]) -> String {
    if available.is_empty() {
        format!("Tool '{}' not found", tool)
    } else {
        format!(
            "Tool '{}' not found. Available tools: {}",
            tool,
            available.join(", ")
        )
    }
}

impl ToolError {
    pub fn not_found(tool: impl Into<String>, available: Vec<String>) -> Self {
        ToolError::NotFound {
            tool: tool.into(),
            available,
        }
    }

    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, duration_ms: u64) -> Self {
        ToolError::Timeout {
            tool: tool.into(),
            duration_ms,
        }
    }

    pub fn cancelled(tool: impl Into<String>) -> Self {
        ToolError::Cancelled { tool: tool.into() }
    }

    pub fn invalid_descriptor(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidDescriptor {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Name of the tool this error concerns.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound { tool, .. }
            | ToolError::InvalidArguments { tool, .. }
            | ToolError::ExecutionFailed { tool, .. }
            | ToolError::Timeout { tool, .. }
            | ToolError::Cancelled { tool }
            | ToolError::InvalidDescriptor { tool, .. } => tool,
        }
    }

    /// Check if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::NotFound { .. } => "TOOL_NOT_FOUND",
            ToolError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            ToolError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            ToolError::Timeout { .. } => "TIMEOUT",
            ToolError::Cancelled { .. } => "CANCELLED",
            ToolError::InvalidDescriptor { .. } => "INVALID_DESCRIPTOR",
        }
    }

    /// Render this error as the failed result a caller would have received.
    ///
    /// The error text doubles as the result content so models that only read
    /// `content` still see the guidance.
    pub fn to_tool_result(&self) -> ToolResult {
        let message = self.to_string();
        ToolResult::failure(self.tool_name(), message.clone()).with_content(message)
    }
}

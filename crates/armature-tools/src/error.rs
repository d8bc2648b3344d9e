//! Source and registry errors.

use armature_core::ToolError;
use thiserror::Error;

/// Errors raised by a [`ToolSource`](crate::ToolSource).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// A tool with this name already exists in the source.
    #[error("tool '{tool}' is already registered in source '{source_name}'")]
    DuplicateTool { source_name: String, tool: String },

    /// No tool with this name exists in the source.
    #[error("tool '{tool}' not found in source '{source_name}'")]
    ToolNotFound { source_name: String, tool: String },

    /// Listing tools from the provider failed.
    #[error("failed to discover tools from source '{source_name}': {message}")]
    Discovery {
        source_name: String,
        message: String,
    },

    /// The source could not be built from its configuration.
    #[error("invalid configuration for source '{source_name}': {message}")]
    Config {
        source_name: String,
        message: String,
    },

    /// Discovery was cancelled by the caller.
    #[error("tool discovery for source '{source_name}' was cancelled")]
    Cancelled { source_name: String },

    /// A tool handed to the source has an invalid descriptor.
    #[error(transparent)]
    InvalidTool(#[from] ToolError),
}

impl SourceError {
    pub fn discovery(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Discovery {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn config(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Config {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Check if running discovery again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Discovery { .. })
    }
}

/// Errors raised by the [`ToolRegistry`](crate::ToolRegistry).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("source name cannot be empty")]
    EmptySourceName,

    #[error("source '{0}' is already registered")]
    DuplicateSource(String),

    #[error("source '{0}' is not registered")]
    SourceNotFound(String),

    /// Two sources offer a tool with the same name.
    #[error(
        "tool '{tool}' from source '{new_source}' conflicts with the tool registered by source '{existing_source}'"
    )]
    ToolConflict {
        tool: String,
        existing_source: String,
        new_source: String,
    },

    /// No factory is registered for a configured type tag.
    #[error("unknown tool type '{tool_type}' for tool '{tool}'")]
    UnknownToolType { tool: String, tool_type: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl RegistryError {
    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            RegistryError::EmptySourceName => "EMPTY_SOURCE_NAME",
            RegistryError::DuplicateSource(_) => "DUPLICATE_SOURCE",
            RegistryError::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            RegistryError::ToolConflict { .. } => "TOOL_CONFLICT",
            RegistryError::UnknownToolType { .. } => "UNKNOWN_TOOL_TYPE",
            RegistryError::Config(_) => "CONFIG_ERROR",
            RegistryError::Source(_) => "SOURCE_ERROR",
            RegistryError::Tool(e) => e.error_code(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

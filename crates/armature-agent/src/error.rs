//! Error types for agent delegation.

use thiserror::Error;

/// Errors that can occur when resolving or calling an agent.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AgentError {
    /// No agent is registered under this id.
    #[error("Agent not found: {agent_id}{}", available_suffix(.available))]
    AgentNotFound {
        agent_id: String,
        available: Vec<String>,
    },

    /// The agent could not be reached.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The agent did not answer in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The agent refused the call because of request volume.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The call was cancelled by the caller.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available agents: {}", available.join(", "))
    }
}

impl AgentError {
    pub fn not_found(agent_id: impl Into<String>, available: Vec<String>) -> Self {
        AgentError::AgentNotFound {
            agent_id: agent_id.into(),
            available,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ConnectionError(_) | AgentError::Timeout(_) | AgentError::RateLimited(_)
        )
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            AgentError::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            AgentError::ConnectionError(_) => "CONNECTION_ERROR",
            AgentError::Timeout(_) => "TIMEOUT",
            AgentError::RateLimited(_) => "RATE_LIMITED",
            AgentError::InvalidRequest(_) => "INVALID_REQUEST",
            AgentError::InvalidResponse(_) => "INVALID_RESPONSE",
            AgentError::Cancelled(_) => "CANCELLED",
            AgentError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidResponse(err.to_string())
    }
}

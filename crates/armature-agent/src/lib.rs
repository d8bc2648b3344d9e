//! # Armature Agent
//!
//! Agent-to-agent delegation exposed as a tool.
//!
//! - [`AgentDirectory`] resolves an agent id to an [`AgentHandle`], which is
//!   either a basic client or one that also streams.
//! - [`DelegationTool`] (`agent_call`) sends a task to the resolved agent and
//!   turns the answer, or the failure, into text a model can act on.
//!
//! ```rust,no_run
//! use armature_agent::{DelegationTool, InMemoryAgentDirectory};
//! use armature_tools::{LocalSource, ToolRegistry};
//! use armature_core::CancellationToken;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Arc::new(InMemoryAgentDirectory::new());
//! let local = LocalSource::new("builtin");
//! local.register_tool(Arc::new(DelegationTool::new(directory))).await?;
//!
//! let registry = ToolRegistry::new();
//! registry.register_source(Arc::new(local), &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod delegation;
pub mod directory;
pub mod error;
pub mod types;

pub use delegation::{AGENT_CALL_TOOL, DelegationTool, register_factory, response_text};
pub use directory::{
    AgentClient, AgentDirectory, AgentEventStream, AgentHandle, InMemoryAgentDirectory,
    StreamingAgentClient,
};
pub use error::{AgentError, AgentResult};
pub use types::{
    Artifact, Message, Part, Role, SendMessageRequest, SendMessageResponse, StreamEvent, Task,
    TaskState, TaskStatus,
};

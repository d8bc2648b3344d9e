//! Tool capability traits.
//!
//! A [`Tool`] is the unit of invocation. Tools that can report progress while
//! they run also implement [`StreamingTool`] and advertise it through
//! [`Tool::streaming`], so callers ask for the capability instead of guessing
//! at the concrete type.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::descriptor::ToolDescriptor;
use crate::error::ToolError;
use crate::result::ToolResult;

/// Named call arguments, as decoded from a model's tool call.
pub type ToolArgs = Map<String, Value>;

/// A named, schema-described, invocable capability.
///
/// Implementations must be safe to call concurrently; the registry never
/// serializes calls to the same tool.
///
/// # Errors
///
/// `execute` returns `Ok` with `success == false` for failures the tool
/// reports as ordinary output, and `Err` when the execution itself failed.
/// [`ToolError::to_tool_result`] renders the latter into a result.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema shown to the agent runtime.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Tool name, unique within its source.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Run the tool once.
    async fn execute(
        &self,
        args: ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError>;

    /// Streaming view of this tool, if it produces incremental output.
    fn streaming(self: Arc<Self>) -> Option<Arc<dyn StreamingTool>> {
        None
    }
}

/// A tool that emits text increments while it runs.
///
/// Each chunk is a delta, not the accumulated text. The sender is dropped when
/// `execute_streaming` returns, which closes the channel for the reader.
#[async_trait]
pub trait StreamingTool: Tool {
    async fn execute_streaming(
        &self,
        args: ToolArgs,
        chunks: mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError>;
}

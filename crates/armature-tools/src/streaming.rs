//! Streaming orchestration.
//!
//! [`StreamingOrchestrator`] runs a [`StreamingTool`] in the background and
//! republishes its output to a [`ChunkSink`] as cumulative text, so a caller
//! rendering partial progress never has to stitch deltas together.

use armature_core::{CancellationToken, StreamingTool, ToolArgs, ToolError, ToolResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default capacity of the chunk queue between tool and orchestrator.
pub const DEFAULT_CHUNK_BUFFER: usize = 32;

/// The downstream consumer went away or refused a chunk.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("chunk sink failed: {0}")]
pub struct SinkError(pub String);

/// Errors that end a streaming run early.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StreamingError {
    #[error("streaming execution of '{0}' was cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Receives the accumulated output after every non-empty chunk.
#[async_trait]
pub trait ChunkSink: Send {
    async fn emit(&mut self, accumulated: &str) -> Result<(), SinkError>;
}

#[async_trait]
impl<F> ChunkSink for F
where
    F: FnMut(&str) -> Result<(), SinkError> + Send,
{
    async fn emit(&mut self, accumulated: &str) -> Result<(), SinkError> {
        self(accumulated)
    }
}

/// Forwards accumulated text into a channel. Fails once the receiver is gone.
pub struct ChannelSink(pub mpsc::Sender<String>);

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn emit(&mut self, accumulated: &str) -> Result<(), SinkError> {
        self.0
            .send(accumulated.to_string())
            .await
            .map_err(|_| SinkError("receiver dropped".to_string()))
    }
}

/// Runs a streaming tool and publishes cumulative output.
pub struct StreamingOrchestrator {
    tool: Arc<dyn StreamingTool>,
    buffer: usize,
}

impl StreamingOrchestrator {
    pub fn new(tool: Arc<dyn StreamingTool>) -> Self {
        Self {
            tool,
            buffer: DEFAULT_CHUNK_BUFFER,
        }
    }

    /// Capacity of the chunk queue. A slow sink makes the tool wait once the
    /// queue is full.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Execute the tool, emitting accumulated text to `sink` as it grows.
    ///
    /// The tool runs as a separate task bound to `cancel`. The synthesized
    /// result prefers the accumulated text over the tool's own `content`,
    /// which is used only if no chunk was ever emitted. An execution error
    /// takes precedence over a failed result's `error`.
    ///
    /// # Errors
    ///
    /// Returns immediately when `cancel` fires or the sink fails, without
    /// waiting for the tool task. The task keeps the same token and is
    /// expected to unwind on its own; it is not aborted here.
    pub async fn execute<S>(
        &self,
        args: ToolArgs,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<ToolResult, StreamingError>
    where
        S: ChunkSink + ?Sized,
    {
        let start = Instant::now();
        let tool_name = self.tool.name().to_string();
        let (tx, mut rx) = mpsc::channel::<String>(self.buffer);

        let tool = Arc::clone(&self.tool);
        let task_cancel = cancel.clone();
        let mut handle =
            tokio::spawn(async move { tool.execute_streaming(args, tx, &task_cancel).await });

        let mut accumulated = String::new();
        let mut chunks = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(tool = %tool_name, chunks, "Streaming execution cancelled");
                    return Err(StreamingError::Cancelled(tool_name));
                }
                chunk = rx.recv() => match chunk {
                    Some(chunk) if chunk.is_empty() => continue,
                    Some(chunk) => {
                        accumulated.push_str(&chunk);
                        chunks += 1;
                        if let Err(e) = sink.emit(&accumulated).await {
                            warn!(tool = %tool_name, error = %e, "Chunk sink failed, abandoning stream");
                            return Err(e.into());
                        }
                    }
                    None => break,
                }
            }
        }

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamingError::Cancelled(tool_name)),
            joined = &mut handle => joined,
        };

        let (result, execution_error) = match joined {
            Ok(Ok(result)) => (Some(result), None),
            Ok(Err(e)) => (None, Some(e)),
            Err(join_error) => (
                None,
                Some(ToolError::execution_failed(
                    &tool_name,
                    format!("streaming task failed: {}", join_error),
                )),
            ),
        };

        let mut synthesized = ToolResult::success(&tool_name, String::new());
        if let Some(result) = &result {
            synthesized.output = result.output.clone();
            synthesized.metadata = result.metadata.clone();
        }

        synthesized.content = if chunks > 0 {
            accumulated
        } else {
            result
                .as_ref()
                .map(|r| r.content.clone())
                .unwrap_or_default()
        };

        let error = match (&execution_error, &result) {
            (Some(e), _) => Some(e.to_string()),
            (None, Some(r)) if !r.success => Some(r.error.clone()),
            _ => None,
        };
        if let Some(error) = error {
            let failed = ToolResult::failure(&tool_name, error);
            synthesized.success = false;
            synthesized.error = failed.error;
        }

        synthesized.execution_duration = start.elapsed();
        debug!(
            tool = %tool_name,
            chunks,
            success = synthesized.success,
            "Streaming execution finished"
        );
        Ok(synthesized)
    }
}

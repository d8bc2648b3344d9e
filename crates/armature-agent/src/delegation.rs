//! The `agent_call` tool: delegate a task to another agent.
//!
//! Targets that stream are driven directly and their text is forwarded as it
//! arrives, behind a one-time `[Delegated to: X]` banner. Other targets get
//! one blocking call whose answer is emitted as a single chunk.

use armature_core::{
    CancellationToken, ParameterDescriptor, ParameterType, StreamingTool, Tool, ToolArgs,
    ToolDescriptor, ToolError, ToolResult,
};
use armature_tools::ToolFactoryTable;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::directory::{AgentDirectory, AgentHandle, StreamingAgentClient};
use crate::error::AgentError;
use crate::types::{Message, SendMessageRequest, SendMessageResponse, StreamEvent, TaskState};

/// Default tool name and configuration type tag.
pub const AGENT_CALL_TOOL: &str = "agent_call";

const DESCRIPTION: &str = "Call another agent to delegate a task or get specialized assistance. \
Use this tool when you need information or capabilities that another agent provides. \
You MUST use the exact agent ID from the available agents list - do not invent or abbreviate agent names.";

const NO_RESPONSE: &str = "No response content";

/// Delegates a task to an agent resolved through an [`AgentDirectory`].
pub struct DelegationTool {
    descriptor: ToolDescriptor,
    directory: Arc<dyn AgentDirectory>,
}

/// Validated call arguments.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    agent_id: String,
    task: String,
}

/// Why a delegated call failed, for choosing guidance text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Unreachable,
    Timeout,
    RateLimited,
    NotFound,
    Other,
}

impl DelegationTool {
    pub fn new(directory: Arc<dyn AgentDirectory>) -> Self {
        Self::with_name(AGENT_CALL_TOOL, directory)
    }

    pub fn with_name(name: impl Into<String>, directory: Arc<dyn AgentDirectory>) -> Self {
        let descriptor = ToolDescriptor::new(name, DESCRIPTION)
            .with_parameter(
                ParameterDescriptor::new(
                    "agent",
                    ParameterType::String,
                    "The exact agent ID to call (must match one of the available agents listed in the context). \
                     Use the full agent ID exactly as shown - do not abbreviate or invent names.",
                )
                .required(),
            )
            .with_parameter(
                ParameterDescriptor::new(
                    "task",
                    ParameterType::String,
                    "The task, question, or request to send to the agent. \
                     Be clear and specific about what information or action you need.",
                )
                .required(),
            );
        Self {
            descriptor,
            directory,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    async fn resolve(&self, call: &Call) -> Result<AgentHandle, ToolError> {
        match self.directory.resolve_agent(&call.agent_id).await {
            Ok(handle) => Ok(handle),
            Err(e @ AgentError::AgentNotFound { .. }) => {
                warn!(agent = %call.agent_id, "Delegation target not found");
                Err(ToolError::execution_failed(
                    self.name(),
                    self.not_found_message(&call.agent_id, &e),
                ))
            }
            Err(e) => Err(self.call_error(&call.agent_id, e)),
        }
    }

    fn not_found_message(&self, agent_id: &str, err: &AgentError) -> String {
        match err {
            AgentError::AgentNotFound { available, .. } if !available.is_empty() => format!(
                "Agent '{agent_id}' was not found. The agent name you used does not exist.\n\n\
                 Available agents: {}\n\n\
                 To fix this:\n\
                 - Use one of the exact agent IDs listed above\n\
                 - Do not invent agent names - only use the IDs from the list above\n\n\
                 Please retry the {} tool with the correct agent ID.",
                available.join(", "),
                self.name(),
            ),
            _ => format!(
                "Agent '{agent_id}' not found. {err}\n\n\
                 Please check the available agents list in the context and use the correct agent ID."
            ),
        }
    }

    fn call_error(&self, agent_id: &str, err: AgentError) -> ToolError {
        if matches!(err, AgentError::Cancelled(_)) {
            return ToolError::cancelled(self.name());
        }
        let message = match failure_kind(&err) {
            FailureKind::Unreachable => format!(
                "Agent '{agent_id}' is not reachable at its configured URL. \
                 The agent service may be down or the URL is incorrect. Error: {err}"
            ),
            FailureKind::Timeout => format!(
                "Agent '{agent_id}' did not respond within the timeout period. \
                 The agent may be overloaded or slow. Error: {err}"
            ),
            FailureKind::RateLimited => format!(
                "Agent '{agent_id}' is rate limiting requests. Please wait and try again later. Error: {err}"
            ),
            FailureKind::NotFound => format!(
                "Agent '{agent_id}' was not found. \
                 The agent may not be registered or the agent ID is incorrect. Error: {err}"
            ),
            FailureKind::Other => format!("Failed to call agent '{agent_id}': {err}"),
        };
        warn!(agent = %agent_id, code = err.error_code(), "Delegated call failed");
        ToolError::execution_failed(self.name(), message)
    }

    async fn emit(&self, chunks: &mpsc::Sender<String>, text: String) -> Result<(), ToolError> {
        chunks
            .send(text)
            .await
            .map_err(|_| ToolError::execution_failed(self.name(), "chunk receiver closed"))
    }

    fn finish(&self, call: &Call, answer: &str, start: Instant, streaming: bool) -> ToolResult {
        let mut result = ToolResult::success(self.name(), format!("{}{}", banner(&call.agent_id), answer))
            .with_metadata("agent_id", json!(call.agent_id))
            .with_metadata("task", json!(call.task))
            .with_metadata("execution_time_ms", json!(start.elapsed().as_millis() as u64))
            .with_duration(start.elapsed());
        if streaming {
            result = result.with_metadata("streaming", Value::Bool(true));
        }
        result
    }

    async fn send_blocking(
        &self,
        handle: &AgentHandle,
        call: &Call,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let request = SendMessageRequest::blocking(build_message(call));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ToolError::cancelled(self.name())),
            response = handle.send_message(request, cancel) => response,
        };
        response
            .map(|r| response_text(&r))
            .map_err(|e| self.call_error(&call.agent_id, e))
    }

    async fn stream_from(
        &self,
        client: &dyn StreamingAgentClient,
        call: &Call,
        chunks: &mpsc::Sender<String>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<ToolResult, ToolError> {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return Err(ToolError::cancelled(self.name())),
            opened = client.stream_message(build_message(call), cancel) => opened,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(e) => {
                let err = self.call_error(&call.agent_id, e);
                let _ = chunks.send(err.to_string()).await;
                return Err(err);
            }
        };

        let mut banner_sent = false;
        let mut answer = String::new();
        let mut terminal: Option<(String, TaskState)> = None;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ToolError::cancelled(self.name())),
                event = events.next() => event,
            };
            let Some(event) = event else { break };
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    let err = self.call_error(&call.agent_id, e);
                    let _ = chunks.send(err.to_string()).await;
                    return Err(err);
                }
            };

            if !banner_sent {
                self.emit(chunks, banner(&call.agent_id)).await?;
                banner_sent = true;
            }

            // Terminal task snapshots repeat what was streamed; use them only
            // when nothing has arrived yet.
            let text = match event {
                StreamEvent::Message(message) => message.text(),
                StreamEvent::ArtifactUpdate { artifact, .. } => artifact.content_text(),
                StreamEvent::Task(task) => match task.state() {
                    Some(state) if state.is_terminal() => {
                        let text = if answer.is_empty() {
                            task.answer_text()
                        } else {
                            String::new()
                        };
                        terminal = Some((task.id, state));
                        text
                    }
                    _ => String::new(),
                },
                StreamEvent::StatusUpdate { task_id, status } if status.state.is_terminal() => {
                    let text = match (&status.update, answer.is_empty()) {
                        (Some(update), true) => update.text(),
                        _ => String::new(),
                    };
                    terminal = Some((task_id, status.state));
                    text
                }
                StreamEvent::StatusUpdate { .. } => String::new(),
            };

            if !text.is_empty() {
                answer.push_str(&text);
                self.emit(chunks, text).await?;
            }
        }

        if answer.is_empty()
            && let Some((task_id, state)) = &terminal
        {
            answer = terminal_fallback(task_id, *state);
            if !banner_sent {
                self.emit(chunks, banner(&call.agent_id)).await?;
            }
            self.emit(chunks, answer.clone()).await?;
        }
        if answer.is_empty() {
            answer = NO_RESPONSE.to_string();
        }

        let mut result = self.finish(call, &answer, start, true);
        if let Some((_, state)) = terminal {
            result = result.with_metadata("task_state", json!(state.as_str()));
        }
        Ok(result)
    }
}

#[async_trait]
impl Tool for DelegationTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        args: ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let call = match parse_args(&args) {
            Ok(call) => call,
            Err(message) => return Ok(ToolResult::failure(self.name(), message)),
        };

        let handle = self.resolve(&call).await?;
        info!(agent = %call.agent_id, "Delegating task");
        let answer = self.send_blocking(&handle, &call, cancel).await?;
        Ok(self.finish(&call, &answer, start, false))
    }

    fn streaming(self: Arc<Self>) -> Option<Arc<dyn StreamingTool>> {
        Some(self)
    }
}

#[async_trait]
impl StreamingTool for DelegationTool {
    async fn execute_streaming(
        &self,
        args: ToolArgs,
        chunks: mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let call = match parse_args(&args) {
            Ok(call) => call,
            Err(message) => return Ok(ToolResult::failure(self.name(), message)),
        };

        let handle = match self.resolve(&call).await {
            Ok(handle) => handle,
            Err(err) => {
                if !matches!(err, ToolError::Cancelled { .. }) {
                    let _ = chunks.send(err.to_string()).await;
                }
                return Err(err);
            }
        };
        match &handle {
            AgentHandle::Streaming(client) => {
                info!(agent = %call.agent_id, "Delegating task with streaming");
                self.stream_from(client.as_ref(), &call, &chunks, cancel, start)
                    .await
            }
            AgentHandle::Basic(_) => {
                debug!(agent = %call.agent_id, "Target does not stream, using a blocking call");
                let answer = match self.send_blocking(&handle, &call, cancel).await {
                    Ok(answer) => answer,
                    Err(err) => {
                        if !matches!(err, ToolError::Cancelled { .. }) {
                            let _ = chunks.send(err.to_string()).await;
                        }
                        return Err(err);
                    }
                };
                self.emit(&chunks, format!("{}{}", banner(&call.agent_id), answer))
                    .await?;
                Ok(self.finish(&call, &answer, start, false))
            }
        }
    }
}

/// Register the `agent_call` tool type against `directory`.
pub fn register_factory(table: &mut ToolFactoryTable, directory: Arc<dyn AgentDirectory>) {
    table.register_tool(AGENT_CALL_TOOL, move |name, config| {
        let mut tool = DelegationTool::with_name(name, Arc::clone(&directory));
        if let Some(description) = &config.description {
            tool = tool.with_description(description);
        }
        Ok(Arc::new(tool) as Arc<dyn Tool>)
    });
}

fn banner(agent_id: &str) -> String {
    format!("[Delegated to: {}]\n\n", agent_id)
}

/// Read `agent` (or `agent_name`) and `task` (or `message`).
fn parse_args(args: &ToolArgs) -> Result<Call, String> {
    let agent_id = string_arg(args, "agent", "agent_name")
        .ok_or_else(|| "missing or invalid 'agent' parameter".to_string())?;
    let task = string_arg(args, "task", "message")
        .ok_or_else(|| "missing or invalid 'task' parameter".to_string())?;

    let agent_id = agent_id.trim();
    if agent_id.is_empty() {
        return Err("agent ID cannot be empty".to_string());
    }
    let task = task.trim();
    if task.is_empty() {
        return Err("task cannot be empty".to_string());
    }
    Ok(Call {
        agent_id: agent_id.to_string(),
        task: task.to_string(),
    })
}

fn string_arg<'a>(args: &'a ToolArgs, key: &str, alias: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .or_else(|| args.get(alias).and_then(Value::as_str))
}

fn build_message(call: &Call) -> Message {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Message::user(format!("agent_call_{}_{}", call.agent_id, nanos), &call.task)
        .with_context_id(format!("{}:agent_call_session", call.agent_id))
}

fn failure_kind(err: &AgentError) -> FailureKind {
    match err {
        AgentError::ConnectionError(_) => FailureKind::Unreachable,
        AgentError::Timeout(_) => FailureKind::Timeout,
        AgentError::RateLimited(_) => FailureKind::RateLimited,
        AgentError::AgentNotFound { .. } => FailureKind::NotFound,
        other => {
            let text = other.to_string().to_lowercase();
            if text.contains("connection refused") || text.contains("no such host") {
                FailureKind::Unreachable
            } else if text.contains("timeout")
                || text.contains("timed out")
                || text.contains("deadline exceeded")
            {
                FailureKind::Timeout
            } else if text.contains("429") || text.contains("rate limit") {
                FailureKind::RateLimited
            } else if text.contains("not found") || text.contains("404") {
                FailureKind::NotFound
            } else {
                FailureKind::Other
            }
        }
    }
}

fn terminal_fallback(task_id: &str, state: TaskState) -> String {
    match state {
        TaskState::Failed => format!("Task {task_id} failed but no error message was provided"),
        TaskState::Cancelled => format!("Task {task_id} was cancelled"),
        TaskState::Rejected => format!("Task {task_id} was rejected by the agent"),
        _ => format!("Task {task_id} completed but no response content found"),
    }
}

/// Text answer of a blocking call.
pub fn response_text(response: &SendMessageResponse) -> String {
    let text = match response {
        SendMessageResponse::Message(message) => message.text(),
        SendMessageResponse::Task(task) => match task.state() {
            None => format!("Task {} has no status information", task.id),
            Some(state) if state.is_terminal() => {
                let text = task.answer_text();
                if text.is_empty() {
                    terminal_fallback(&task.id, state)
                } else {
                    text
                }
            }
            Some(state) => format!(
                "Task {} is still {} (expected terminal state with blocking=true)",
                task.id, state
            ),
        },
    };
    if text.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text
    }
}

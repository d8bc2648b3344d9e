//! `armature tools` subcommands.

use armature_agent::{AgentHandle, InMemoryAgentDirectory};
use armature_core::{CancellationToken, ToolArgs, ToolError, ToolResult};
use armature_observability::{MetricsError, ToolMetrics};
use armature_tools::{
    ChunkSink, RegistryError, SinkError, StreamingError, ToolFactoryTable,
    ToolRegistry, ToolsConfig,
};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::echo::{ECHO_AGENT_ID, EchoAgent};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid --args: {0}")]
    Args(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Streaming(#[from] StreamingError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub args: ToolArgs,
    pub stream: bool,
}

/// Factory table with every built-in type tag.
pub fn factories(directory: Arc<InMemoryAgentDirectory>) -> ToolFactoryTable {
    let mut table = ToolFactoryTable::new();
    armature_mcp::register_factory(&mut table);
    armature_agent::register_factory(&mut table, directory);
    table
}

/// Build the registry described by `config`.
///
/// The agent directory only knows the built-in `echo` agent; remote agent
/// transports are not wired into the CLI.
pub async fn build_registry(
    config: &ToolsConfig,
    with_metrics: bool,
    cancel: &CancellationToken,
) -> Result<ToolRegistry, CliError> {
    let directory = Arc::new(InMemoryAgentDirectory::new());
    directory
        .register(ECHO_AGENT_ID, AgentHandle::basic(EchoAgent))
        .await;

    let mut registry = ToolRegistry::new();
    if with_metrics {
        registry = registry.with_metrics(ToolMetrics::new(&config.observability.namespace)?);
    }
    registry
        .load_config(config, &factories(directory), cancel)
        .await?;

    info!(
        sources = registry.source_names().await.len(),
        tools = registry.len().await,
        "Registry ready"
    );
    Ok(registry)
}

/// Parse `--args` into a JSON object.
pub fn parse_args(raw: &str) -> Result<ToolArgs, CliError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| CliError::Args(e.to_string()))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(CliError::Args(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// One entry per tool, sorted by name and tagged with its source.
pub async fn render_tools(registry: &ToolRegistry, exclude_internal: bool) -> String {
    let tools = registry.list_tools_filtered(exclude_internal).await;
    if tools.is_empty() {
        return "No tools available\n".to_string();
    }

    let mut out = String::new();
    for tool in tools {
        let _ = writeln!(out, "{} [{}]", tool.name, tool.source);
        if !tool.description.is_empty() {
            let summary = tool.description.lines().next().unwrap_or_default();
            let _ = writeln!(out, "    {}", summary);
        }
        for parameter in &tool.parameters {
            let marker = if parameter.required { "*" } else { "" };
            let _ = writeln!(
                out,
                "    - {}{}: {}",
                parameter.name,
                marker,
                parameter.param_type.as_str()
            );
        }
    }
    out
}

/// Execute `name`, streaming through `sink` when asked and supported.
///
/// Hard tool errors are folded into a failed [`ToolResult`] so the caller
/// always has something to print. Cancellation and sink failures stay errors.
pub async fn call_tool<S>(
    registry: &ToolRegistry,
    name: &str,
    options: CallOptions,
    cancel: &CancellationToken,
    sink: &mut S,
) -> Result<ToolResult, CliError>
where
    S: ChunkSink + ?Sized,
{
    if options.stream {
        if let Some(outcome) = registry
            .execute_streaming(name, options.args.clone(), cancel, sink)
            .await
        {
            return Ok(outcome?);
        }
        debug!(tool = %name, "Tool does not stream, executing normally");
    }

    match registry.execute_tool(name, options.args, cancel).await {
        Ok(result) => Ok(result),
        Err(e @ ToolError::Cancelled { .. }) => Err(e.into()),
        Err(e) => Ok(e.to_tool_result()),
    }
}

/// Prints only the newly accumulated suffix of each emission.
#[derive(Debug, Default)]
pub struct StdoutSink {
    printed: usize,
}

impl StdoutSink {
    pub fn printed(&self) -> bool {
        self.printed > 0
    }
}

#[async_trait]
impl ChunkSink for StdoutSink {
    async fn emit(&mut self, accumulated: &str) -> Result<(), SinkError> {
        let fresh = accumulated.get(self.printed..).unwrap_or(accumulated);
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(fresh.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| SinkError(e.to_string()))?;
        self.printed = accumulated.len();
        Ok(())
    }
}

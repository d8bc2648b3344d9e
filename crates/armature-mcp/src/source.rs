//! MCP tool source and the tools it discovers.

use armature_core::{CancellationToken, Tool, ToolArgs, ToolDescriptor, ToolError, ToolResult};
use armature_tools::{SourceError, ToolConfig, ToolFactoryTable, ToolSource};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classify::{CallOutcome, classify};
use crate::error::{McpError, McpResult};
use crate::protocol::{
    ClientInfo, JsonRpcRequest, JsonRpcResponse, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, RemoteToolDefinition, SESSION_HEADER, initialize_params, tool_entries,
};
use crate::schema::parameters_from_schema;
use crate::sse;
use crate::transport::{HttpTransport, HttpTransportConfig};

/// Kind reported by [`McpToolSource::kind`] and tag used in configuration.
pub const MCP_SOURCE_KIND: &str = "mcp";

/// Default bound on reading an event-stream response.
pub const DEFAULT_SSE_TIMEOUT: Duration = Duration::from_secs(300);

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Connection state shared between a source and the tools it hands out.
///
/// The session id has its own lock, separate from the source's tool map, so
/// a discovery pass rewriting the map never delays a call that only needs
/// to read the session header.
#[derive(Debug)]
struct McpClient {
    source_name: String,
    server_url: String,
    transport: HttpTransport,
    sse_timeout: Duration,
    client_info: ClientInfo,
    session_id: RwLock<Option<String>>,
    next_id: AtomicU64,
}

impl McpClient {
    async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> McpResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let headers = self.request_headers().await?;

        debug!(source = %self.source_name, method, id, "Sending MCP request");
        let response = self
            .transport
            .post_json(&self.server_url, &request, headers, cancel)
            .await?;

        self.capture_session(response.headers()).await;

        let status = response.status();
        if !status.is_success() {
            let timeout = self.transport.config().timeout;
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(McpError::Cancelled),
                body = tokio::time::timeout(timeout, response.text()) => body,
            };
            // A body that stalls or fails to decode still leaves the status.
            let body = body.ok().and_then(Result::ok).unwrap_or_default();
            return Err(McpError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let envelope = if content_type.starts_with("text/event-stream") {
            sse::read_response(response.bytes_stream(), self.sse_timeout, cancel).await?
        } else if content_type.is_empty() || content_type.contains("json") {
            let timeout = self.transport.config().timeout;
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(McpError::Cancelled),
                body = tokio::time::timeout(timeout, response.bytes()) => body,
            };
            let body = body
                .map_err(|_| McpError::transport("timed out reading response body"))?
                .map_err(|e| McpError::transport(format!("failed to read response body: {}", e)))?;
            parse_json_body(&body)?
        } else {
            return Err(McpError::protocol(format!(
                "unsupported content type: {}",
                content_type
            )));
        };

        envelope.into_result()
    }

    async fn request_headers(&self) -> McpResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_BOTH));
        if let Some(session) = self.session_id.read().await.as_deref() {
            let value = HeaderValue::from_str(session)
                .map_err(|e| McpError::protocol(format!("invalid session id: {}", e)))?;
            headers.insert(SESSION_HEADER, value);
        }
        Ok(headers)
    }

    async fn capture_session(&self, headers: &HeaderMap) {
        let Some(session) = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return;
        };

        let mut current = self.session_id.write().await;
        if current.as_deref() != Some(session) {
            debug!(source = %self.source_name, session, "Stored MCP session id");
            *current = Some(session.to_string());
        }
    }

    async fn initialize(&self, cancel: &CancellationToken) -> McpResult<Value> {
        self.call(
            METHOD_INITIALIZE,
            Some(initialize_params(&self.client_info)),
            cancel,
        )
        .await
    }
}

fn parse_json_body(body: &[u8]) -> McpResult<JsonRpcResponse> {
    let text = String::from_utf8_lossy(body);
    match JsonRpcResponse::parse(&text) {
        Ok(Some(response)) => Ok(response),
        Ok(None) => Err(McpError::protocol(format!(
            "response is not a JSON-RPC result: {}",
            text
        ))),
        Err(e) => Err(McpError::protocol(format!(
            "failed to parse response as JSON: {}",
            e
        ))),
    }
}

/// A tool hosted on an MCP server.
pub struct McpTool {
    descriptor: ToolDescriptor,
    client: Arc<McpClient>,
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.descriptor.name)
            .field("server_url", &self.client.server_url)
            .finish()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        args: ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        let name = self.descriptor.name.as_str();
        self.descriptor.check_required(&args)?;

        let start = Instant::now();
        let params = json!({ "name": name, "arguments": args });
        let result = self
            .client
            .call(METHOD_TOOLS_CALL, Some(params), cancel)
            .await
            .map_err(|e| e.into_tool_error(name))?;

        match classify(&result) {
            CallOutcome::Failure(message) => {
                debug!(tool = %name, error = %message, "MCP tool reported failure");
                Err(McpError::ToolReported(message).into_tool_error(name))
            }
            CallOutcome::Success {
                content,
                structured,
                metadata,
            } => {
                let mut tool_result = ToolResult::success(name, content)
                    .with_duration(start.elapsed())
                    .with_metadata("source", json!(self.client.source_name))
                    .with_metadata("server_url", json!(self.client.server_url));
                for (key, value) in metadata {
                    tool_result.metadata.entry(key).or_insert(value);
                }
                if let Some(structured) = structured {
                    tool_result = tool_result.with_output(structured);
                }
                Ok(tool_result)
            }
        }
    }
}

/// Tool source backed by one MCP server.
///
/// Tools are fetched with `tools/list` on every [`discover_tools`] call and
/// the local set is replaced only when the listing succeeds.
///
/// [`discover_tools`]: ToolSource::discover_tools
#[derive(Debug)]
pub struct McpToolSource {
    name: String,
    description: Option<String>,
    client: Arc<McpClient>,
    tools: RwLock<HashMap<String, Arc<McpTool>>>,
}

impl McpToolSource {
    pub fn builder(server_url: impl Into<String>) -> McpToolSourceBuilder {
        McpToolSourceBuilder::new(server_url)
    }

    /// Build a source from a configuration entry.
    pub fn from_config(name: &str, config: &ToolConfig) -> Result<Self, SourceError> {
        let Some(server_url) = config.server_url() else {
            return Err(SourceError::config(
                name,
                "server_url is required for MCP source",
            ));
        };
        let invalid = |e: armature_tools::RegistryError| SourceError::config(name, e.to_string());

        let mut builder = McpToolSourceBuilder::new(server_url)
            .name(name)
            .insecure_skip_verify(config.insecure_skip_verify);
        if let Some(description) = &config.description {
            builder = builder.description(description);
        }
        if let Some(timeout) = config.timeout().map_err(invalid)? {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.sse_timeout().map_err(invalid)? {
            builder = builder.sse_timeout(timeout);
        }
        if let Some(delay) = config.retry_base_delay().map_err(invalid)? {
            builder = builder.retry_base_delay(delay);
        }
        if let Some(retries) = config.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(path) = &config.ca_certificate {
            builder = builder.ca_certificate(path.clone());
        }
        builder
            .build()
            .map_err(|e| SourceError::config(name, e.to_string()))
    }

    pub fn server_url(&self) -> &str {
        &self.client.server_url
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Session id issued by the server, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.client.session_id.read().await.clone()
    }

    /// Names of the currently discovered tools, sorted.
    pub async fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn source_error(&self, error: McpError) -> SourceError {
        match error {
            McpError::Cancelled => SourceError::Cancelled {
                source_name: self.name.clone(),
            },
            other => SourceError::discovery(&self.name, other.to_string()),
        }
    }
}

#[async_trait]
impl ToolSource for McpToolSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        MCP_SOURCE_KIND
    }

    async fn discover_tools(&self, cancel: &CancellationToken) -> Result<(), SourceError> {
        if let Err(e) = self.client.initialize(cancel).await {
            if matches!(e, McpError::Cancelled) {
                return Err(self.source_error(e));
            }
            // Some servers answer tools/list without a handshake.
            debug!(source = %self.name, error = %e, "MCP initialize failed, listing anyway");
        }

        let result = self
            .client
            .call(METHOD_TOOLS_LIST, Some(json!({})), cancel)
            .await
            .map_err(|e| self.source_error(e))?;

        let entries = tool_entries(&result).map_err(|e| self.source_error(e))?;

        let mut discovered = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Some(definition) = RemoteToolDefinition::from_entry(entry) else {
                warn!(source = %self.name, index, "Skipping MCP tool without a name");
                continue;
            };
            let mut descriptor = ToolDescriptor::new(&definition.name, &definition.description)
                .with_source(&self.name);
            descriptor.parameters = parameters_from_schema(&definition.input_schema);
            if let Err(e) = descriptor.validate() {
                warn!(source = %self.name, tool = %definition.name, error = %e, "Skipping invalid MCP tool");
                continue;
            }
            let tool = McpTool {
                descriptor,
                client: Arc::clone(&self.client),
            };
            discovered.insert(definition.name, Arc::new(tool));
        }

        let count = discovered.len();
        *self.tools.write().await = discovered;
        info!(source = %self.name, server_url = %self.client.server_url, tools = count, "Discovered MCP tools");
        Ok(())
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .read()
            .await
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .read()
            .await
            .get(name)
            .map(|tool| Arc::clone(tool) as Arc<dyn Tool>)
    }
}

/// Builder for [`McpToolSource`].
#[derive(Debug, Clone)]
pub struct McpToolSourceBuilder {
    server_url: String,
    name: Option<String>,
    description: Option<String>,
    transport: HttpTransportConfig,
    sse_timeout: Duration,
    client_info: ClientInfo,
}

impl McpToolSourceBuilder {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            name: None,
            description: None,
            transport: HttpTransportConfig::default(),
            sse_timeout: DEFAULT_SSE_TIMEOUT,
            client_info: ClientInfo::default(),
        }
    }

    /// Source name. Defaults to the server host.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    pub fn sse_timeout(mut self, timeout: Duration) -> Self {
        self.sse_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.transport.max_retries = retries;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.transport.retry_base_delay = delay;
        self
    }

    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.transport.retry_max_delay = delay;
        self
    }

    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.transport.insecure_skip_verify = skip;
        self
    }

    pub fn ca_certificate(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.transport.ca_certificate = Some(path.into());
        self
    }

    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn build(self) -> McpResult<McpToolSource> {
        let server_url = self.server_url.trim().to_string();
        if server_url.is_empty() {
            return Err(McpError::Config(
                "server_url is required for MCP source".to_string(),
            ));
        }
        let parsed = url::Url::parse(&server_url)
            .map_err(|e| McpError::Config(format!("invalid server_url '{}': {}", server_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(McpError::Config(format!(
                "unsupported server_url scheme '{}'",
                parsed.scheme()
            )));
        }

        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| MCP_SOURCE_KIND.to_string());

        let transport = HttpTransport::new(self.transport)?;
        let client = McpClient {
            source_name: name.clone(),
            server_url,
            transport,
            sse_timeout: self.sse_timeout,
            client_info: self.client_info,
            session_id: RwLock::new(None),
            next_id: AtomicU64::new(1),
        };

        Ok(McpToolSource {
            name,
            description: self.description,
            client: Arc::new(client),
            tools: RwLock::new(HashMap::new()),
        })
    }
}

/// Register the `mcp` source type.
pub fn register_factory(table: &mut ToolFactoryTable) {
    table.register_source(MCP_SOURCE_KIND, |name, config| {
        let source = McpToolSource::from_config(name, config)?;
        Ok(Arc::new(source) as Arc<dyn ToolSource>)
    });
}

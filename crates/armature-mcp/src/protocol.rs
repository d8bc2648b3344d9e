//! JSON-RPC 2.0 envelopes and MCP payload types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::McpError;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Response header carrying the server-issued session token.
pub const SESSION_HEADER: &str = "mcp-session-id";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Parse one JSON document as a response envelope.
    ///
    /// Returns `Ok(None)` for valid JSON that is not a response, such as a
    /// server notification interleaved in an event stream.
    pub fn parse(data: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_str(data)?;
        let is_response = value
            .as_object()
            .is_some_and(|object| object.contains_key("result") || object.contains_key("error"));
        if !is_response {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }

    /// The `result` payload, or the JSON-RPC error. `error` wins if a server
    /// sends both.
    pub fn into_result(self) -> Result<Value, McpError> {
        if let Some(error) = self.error {
            return Err(McpError::json_rpc(error.code, error.message));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Client identity sent in `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "armature".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters of the `initialize` request.
pub fn initialize_params(client: &ClientInfo) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": client,
    })
}

/// One tool as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

impl RemoteToolDefinition {
    /// Read one listing entry field by field.
    ///
    /// Returns `None` when the entry is not an object or has no usable
    /// `name`. A `description` that is not a string reads as empty.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let object = entry.as_object()?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())?;
        let description = object
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: object.get("inputSchema").cloned().unwrap_or(Value::Null),
        })
    }
}

/// The raw entries of a `tools/list` result.
///
/// A result without `tools` lists nothing. Each entry is left as JSON so
/// one malformed tool cannot hide the others.
pub fn tool_entries(result: &Value) -> Result<&[Value], McpError> {
    match result.get("tools") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries.as_slice()),
        Some(other) => Err(McpError::protocol(format!(
            "invalid tools/list result: expected an array of tools, got {}",
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

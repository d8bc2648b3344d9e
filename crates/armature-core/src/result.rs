//! Uniform tool execution result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Result of one tool invocation.
///
/// `error` is empty exactly when `success` is true. The constructors keep that
/// invariant; code that mutates the fields directly is expected to as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Human and model readable output.
    #[serde(default)]
    pub content: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: String,
    pub tool_name: String,
    #[serde(default, with = "duration_millis")]
    pub execution_duration: Duration,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            output: None,
            error: String::new(),
            tool_name: tool_name.into(),
            execution_duration: Duration::ZERO,
            metadata: HashMap::new(),
        }
    }

    /// Create a failed result.
    ///
    /// An empty error message is replaced so a failure never has blank error
    /// text.
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            success: false,
            content: String::new(),
            output: None,
            error,
            tool_name: tool_name.into(),
            execution_duration: Duration::ZERO,
            metadata: HashMap::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.execution_duration = duration;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

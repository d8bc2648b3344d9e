//! Decide whether a `tools/call` result is a success or a tool failure.
//!
//! MCP servers report tool failures inconsistently: some set `isError`, some
//! put an `error` string in the result or its metadata, and some simply
//! answer with text that starts with "Error:". The checks below run in a
//! fixed order and the first match wins.

use serde_json::{Map, Value};

/// Content prefixes treated as a failure report (compared lowercased).
///
/// Best effort only: a tool whose normal output starts with one of these is
/// misreported as failed.
const ERROR_PREFIXES: &[&str] = &["error executing tool", "error:", "tool error:"];

/// Outcome of a successful JSON-RPC `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success {
        content: String,
        structured: Option<Value>,
        metadata: Map<String, Value>,
    },
    Failure(String),
}

/// Classify a `tools/call` result payload.
pub fn classify(result: &Value) -> CallOutcome {
    if let Some(message) = result
        .get("metadata")
        .and_then(|m| m.get("error"))
        .and_then(non_empty_str)
    {
        return CallOutcome::Failure(message.to_string());
    }

    if let Some(message) = result.get("error").and_then(non_empty_str) {
        return CallOutcome::Failure(message.to_string());
    }

    let content = extract_content(result);

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let message = if content.is_empty() {
            "tool reported error".to_string()
        } else {
            content
        };
        return CallOutcome::Failure(message);
    }

    let lowered = content.to_lowercase();
    if ERROR_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return CallOutcome::Failure(content);
    }

    CallOutcome::Success {
        content,
        structured: result.get("structuredContent").cloned(),
        metadata: result
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

/// Concatenate the textual parts of a result.
///
/// `content` entries contribute their `text`, or themselves if they are
/// plain strings, one per line. Results without such entries fall back to a
/// top-level `text` or string `content`.
pub fn extract_content(result: &Value) -> String {
    let mut text = String::new();

    if let Some(items) = result.get("content").and_then(Value::as_array) {
        for item in items {
            let part = match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(object) => object.get("text").and_then(Value::as_str),
                _ => None,
            };
            if let Some(part) = part {
                text.push_str(part);
                text.push('\n');
            }
        }
    }

    if text.is_empty() {
        if let Some(s) = result.get("text").and_then(Value::as_str) {
            text.push_str(s);
        } else if let Some(s) = result.get("content").and_then(Value::as_str) {
            text.push_str(s);
        }
    }

    text.trim().to_string()
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

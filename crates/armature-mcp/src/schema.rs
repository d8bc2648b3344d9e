//! Translate MCP `inputSchema` objects into parameter descriptors.

use armature_core::{ParameterDescriptor, ParameterType, default_array_items};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Build parameter descriptors from a JSON Schema object.
///
/// Properties without a usable `type` are dropped. `integer` is reported as
/// `number`. The description is enriched with `examples`, `format` and
/// `pattern` hints so callers that only see text still learn about them.
pub fn parameters_from_schema(schema: &Value) -> Vec<ParameterDescriptor> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    let required: HashSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .filter_map(|(name, property)| {
            let parameter = parameter_from_property(name, property)?;
            Some(if required.contains(name.as_str()) {
                parameter.required()
            } else {
                parameter
            })
        })
        .collect()
}

fn parameter_from_property(name: &str, property: &Value) -> Option<ParameterDescriptor> {
    let property = property.as_object()?;

    let Some(param_type) = schema_type(property) else {
        debug!(parameter = %name, "Skipping parameter without a supported type");
        return None;
    };

    let description = describe(property);
    let mut parameter = ParameterDescriptor::new(name, param_type, description);

    if let Some(values) = property.get("enum").and_then(Value::as_array) {
        let values: Vec<String> = values
            .iter()
            .filter_map(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if !values.is_empty() {
            parameter = parameter.with_enum(values);
        }
    }

    if let Some(default) = property.get("default") {
        parameter = parameter.with_default(default.clone());
    }

    if param_type == ParameterType::Array {
        parameter = parameter.with_items(normalize_items(property.get("items")));
    }

    Some(parameter)
}

/// `type` as a string, or the first non-null entry of a type union.
fn schema_type(property: &Map<String, Value>) -> Option<ParameterType> {
    match property.get("type")? {
        Value::String(t) => ParameterType::from_schema_type(t),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .filter(|t| *t != "null")
            .find_map(ParameterType::from_schema_type),
        _ => None,
    }
}

fn describe(property: &Map<String, Value>) -> String {
    let mut description = property
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(examples) = property.get("examples").and_then(Value::as_array)
        && !examples.is_empty()
        && !description.contains("Example")
    {
        description.push_str("\nExamples:");
        for example in examples {
            description.push_str("\n  ");
            description.push_str(&render(example));
        }
    }

    if let Some(format) = property.get("format").and_then(Value::as_str) {
        description.push_str(&format!(" (format: {})", format));
    }
    if let Some(pattern) = property.get("pattern").and_then(Value::as_str) {
        description.push_str(&format!(" (pattern: {})", pattern));
    }

    description
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Make array `items` a schema object that always carries a `type`.
///
/// Missing or non-object items become `{"type":"string"}`. Nested arrays
/// are normalized recursively.
pub fn normalize_items(items: Option<&Value>) -> Value {
    let Some(Value::Object(items)) = items else {
        return default_array_items();
    };

    let mut normalized = items.clone();
    let item_type = match items.get("type") {
        Some(Value::String(t)) if ParameterType::from_schema_type(t).is_some() => t.clone(),
        _ => "string".to_string(),
    };
    normalized.insert("type".to_string(), Value::String(item_type.clone()));

    if item_type == "array" {
        normalized.insert("items".to_string(), normalize_items(items.get("items")));
    }
    Value::Object(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path"},
                "count": {"type": "integer"},
                "mode": {"type": "string", "enum": ["fast", "", "slow"], "default": "fast"},
                "opaque": {"description": "no type"}
            },
            "required": ["path"]
        });

        let params = parameters_from_schema(&schema);
        assert_eq!(params.len(), 3);

        let path = params.iter().find(|p| p.name == "path").unwrap();
        assert!(path.required);
        assert_eq!(path.param_type, ParameterType::String);
        assert_eq!(path.description, "File path");

        let count = params.iter().find(|p| p.name == "count").unwrap();
        assert_eq!(count.param_type, ParameterType::Number);
        assert!(!count.required);

        let mode = params.iter().find(|p| p.name == "mode").unwrap();
        assert_eq!(
            mode.enum_values,
            Some(vec!["fast".to_string(), "slow".to_string()])
        );
        assert_eq!(mode.default, Some(json!("fast")));
    }

    #[test]
    fn enriches_description() {
        let schema = json!({
            "properties": {
                "when": {
                    "type": "string",
                    "description": "Start time",
                    "examples": ["2024-01-01T00:00:00Z", 5],
                    "format": "date-time"
                },
                "code": {"type": "string", "pattern": "^[A-Z]{3}$"}
            }
        });
        let params = parameters_from_schema(&schema);
        let when = params.iter().find(|p| p.name == "when").unwrap();
        assert_eq!(
            when.description,
            "Start time\nExamples:\n  2024-01-01T00:00:00Z\n  5 (format: date-time)"
        );
        let code = params.iter().find(|p| p.name == "code").unwrap();
        assert_eq!(code.description, " (pattern: ^[A-Z]{3}$)");
    }

    #[test]
    fn existing_examples_are_not_repeated() {
        let schema = json!({
            "properties": {
                "q": {"type": "string", "description": "Example: cats", "examples": ["dogs"]}
            }
        });
        let params = parameters_from_schema(&schema);
        assert_eq!(params[0].description, "Example: cats");
    }

    #[test]
    fn array_items_are_normalized() {
        let schema = json!({
            "properties": {
                "tags": {"type": "array"},
                "ids": {"type": "array", "items": {"type": "integer", "minimum": 0}},
                "grid": {"type": "array", "items": {"type": "array"}},
                "odd": {"type": "array", "items": true}
            }
        });
        let params = parameters_from_schema(&schema);
        let items = |name: &str| {
            params
                .iter()
                .find(|p| p.name == name)
                .and_then(|p| p.items.clone())
                .unwrap()
        };
        assert_eq!(items("tags"), json!({"type": "string"}));
        assert_eq!(items("ids"), json!({"type": "integer", "minimum": 0}));
        assert_eq!(
            items("grid"),
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(items("odd"), json!({"type": "string"}));
    }

    #[test]
    fn nullable_type_union() {
        let schema = json!({"properties": {"note": {"type": ["null", "string"]}}});
        let params = parameters_from_schema(&schema);
        assert_eq!(params[0].param_type, ParameterType::String);
    }

    #[test]
    fn missing_properties_yield_nothing() {
        assert!(parameters_from_schema(&json!({})).is_empty());
        assert!(parameters_from_schema(&Value::Null).is_empty());
    }
}

//! Tool and parameter descriptors.
//!
//! A [`ToolDescriptor`] is the schema an agent runtime shows to a model: the
//! tool's name, what it does, and the parameters it accepts. Descriptors are
//! produced by tool sources and are immutable once handed out.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fmt;

use crate::error::ToolError;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Map a JSON-Schema `type` keyword onto a parameter type.
    ///
    /// `integer` folds into [`ParameterType::Number`]. Unknown keywords
    /// return `None`.
    pub fn from_schema_type(schema_type: &str) -> Option<Self> {
        match schema_type {
            "string" => Some(Self::String),
            "number" | "integer" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// The JSON-Schema keyword for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item schema used for array parameters whose declared items are unusable.
pub fn default_array_items() -> Value {
    json!({ "type": "string" })
}

/// A single parameter accepted by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Item schema, always present for array parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
}

impl ParameterDescriptor {
    /// Create an optional parameter.
    ///
    /// Array parameters start with a `{type: "string"}` item schema so the
    /// descriptor is valid before [`with_items`](Self::with_items) is called.
    pub fn new(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        let items = (param_type == ParameterType::Array).then(default_array_items);
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            default: None,
            enum_values: None,
            items,
        }
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_items(mut self, items: Value) -> Self {
        self.items = Some(items);
        self
    }

    /// Render this parameter as a JSON-Schema property.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!(self.param_type.as_str()));
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(values) = &self.enum_values {
            schema.insert("enum".into(), json!(values));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if self.param_type == ParameterType::Array {
            let items = self.items.clone().unwrap_or_else(default_array_items);
            schema.insert("items".into(), items);
        }
        Value::Object(schema)
    }
}

/// Schema-level description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// Name of the source that owns this tool.
    #[serde(default)]
    pub source: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            source: String::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Names of every parameter marked as required, in declaration order.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check descriptor invariants.
    ///
    /// Parameter names must be unique and every array parameter must carry an
    /// item schema that is a JSON object with a `type`.
    pub fn validate(&self) -> Result<(), ToolError> {
        let mut seen = HashSet::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(ToolError::invalid_descriptor(
                    &self.name,
                    format!("duplicate parameter '{}'", parameter.name),
                ));
            }
            if parameter.param_type == ParameterType::Array {
                let well_formed = parameter
                    .items
                    .as_ref()
                    .and_then(Value::as_object)
                    .is_some_and(|items| items.contains_key("type"));
                if !well_formed {
                    return Err(ToolError::invalid_descriptor(
                        &self.name,
                        format!("array parameter '{}' has no item schema", parameter.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Render the parameter list as a JSON-Schema `object`, the shape
    /// function-calling model providers expect.
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self.required_parameters().collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Names of required parameters that `args` does not supply.
    pub fn missing_required(&self, args: &crate::ToolArgs) -> Vec<String> {
        self.required_parameters()
            .filter(|name| !args.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Fail with [`ToolError::InvalidArguments`] if any required parameter is
    /// absent from `args`.
    pub fn check_required(&self, args: &crate::ToolArgs) -> Result<(), ToolError> {
        let missing = self.missing_required(args);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ToolError::invalid_arguments(
            &self.name,
            format!("missing required parameters: [{}]", missing.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolArgs;

    fn search_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("search", "Search documents")
            .with_parameter(
                ParameterDescriptor::new("query", ParameterType::String, "Search text").required(),
            )
            .with_parameter(ParameterDescriptor::new(
                "tags",
                ParameterType::Array,
                "Tag filter",
            ))
    }

    #[test]
    fn array_parameters_get_default_items() {
        let param = ParameterDescriptor::new("tags", ParameterType::Array, "");
        assert_eq!(param.items, Some(json!({"type": "string"})));

        let scalar = ParameterDescriptor::new("q", ParameterType::String, "");
        assert!(scalar.items.is_none());
    }

    #[test]
    fn validate_rejects_duplicate_parameter_names() {
        let descriptor = search_descriptor().with_parameter(ParameterDescriptor::new(
            "query",
            ParameterType::String,
            "again",
        ));
        let err = descriptor.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate parameter 'query'"));
    }

    #[test]
    fn validate_rejects_array_without_items() {
        let mut param = ParameterDescriptor::new("tags", ParameterType::Array, "");
        param.items = Some(json!("string"));
        let descriptor = ToolDescriptor::new("t", "").with_parameter(param);
        assert!(descriptor.validate().is_err());
        assert!(search_descriptor().validate().is_ok());
    }

    #[test]
    fn check_required_lists_missing_parameters() {
        let descriptor = search_descriptor();
        let mut args = ToolArgs::new();
        let err = descriptor.check_required(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for tool 'search': missing required parameters: [query]"
        );

        args.insert("query".into(), json!("rust"));
        assert!(descriptor.check_required(&args).is_ok());
    }

    #[test]
    fn json_schema_includes_required_and_items() {
        let schema = search_descriptor().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn schema_type_mapping() {
        assert_eq!(
            ParameterType::from_schema_type("integer"),
            Some(ParameterType::Number)
        );
        assert_eq!(ParameterType::from_schema_type("null"), None);
        assert_eq!(ParameterType::Boolean.to_string(), "boolean");
    }
}

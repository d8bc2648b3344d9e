//! Tool configuration.
//!
//! Configuration is read from TOML. Each entry under `[tools.<name>]` names a
//! type tag that is resolved through the [`ToolFactoryTable`]:
//!
//! ```toml
//! [tools.docs]
//! type = "mcp"
//! server_url = "http://localhost:8931/mcp"
//! timeout = "45s"
//!
//! [tools.delegate]
//! type = "agent_call"
//! internal = true
//! ```
//!
//! [`ToolFactoryTable`]: crate::ToolFactoryTable

use armature_observability::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RegistryError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub tools: BTreeMap<String, ToolConfig>,
    pub observability: ObservabilityConfig,
}

impl ToolsConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RegistryError::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::load_from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn load_from_toml(content: &str) -> Result<Self, RegistryError> {
        toml::from_str(content)
            .map_err(|e| RegistryError::Config(format!("failed to parse TOML config: {}", e)))
    }
}

/// One configured tool or tool source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Type tag resolved through the factory table.
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base URL for remote sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Per-request HTTP timeout, e.g. `"30s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Extra timeout for reading streamed responses, e.g. `"5m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sse_timeout: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    /// PEM file with an additional trusted CA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_delay: Option<String>,
    /// Hide the tool from listings shown to the model.
    #[serde(default)]
    pub internal: bool,
    /// Free-form settings handed to the tool's factory.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl ToolConfig {
    /// An enabled entry with only its type tag set.
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            enabled: true,
            description: None,
            server_url: None,
            timeout: None,
            sse_timeout: None,
            insecure_skip_verify: false,
            ca_certificate: None,
            max_retries: None,
            retry_base_delay: None,
            internal: false,
            options: serde_json::Map::new(),
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Parsed `timeout`.
    pub fn timeout(&self) -> Result<Option<Duration>, RegistryError> {
        parse_duration_field("timeout", self.timeout.as_deref())
    }

    /// Parsed `sse_timeout`.
    pub fn sse_timeout(&self) -> Result<Option<Duration>, RegistryError> {
        parse_duration_field("sse_timeout", self.sse_timeout.as_deref())
    }

    /// Parsed `retry_base_delay`.
    pub fn retry_base_delay(&self) -> Result<Option<Duration>, RegistryError> {
        parse_duration_field("retry_base_delay", self.retry_base_delay.as_deref())
    }

    /// Server URL, treating a blank value as absent.
    pub fn server_url(&self) -> Option<&str> {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

fn parse_duration_field(field: &str, value: Option<&str>) -> Result<Option<Duration>, RegistryError> {
    value
        .map(|raw| {
            humantime::parse_duration(raw.trim())
                .map_err(|e| RegistryError::Config(format!("invalid {} '{}': {}", field, raw, e)))
        })
        .transpose()
}

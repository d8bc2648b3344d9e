//! Type-tag factory table.
//!
//! Configuration names tools by a type tag. Rather than a central match over
//! every concrete tool type, each crate that provides tools registers a
//! factory for its tags at startup. A tag maps either to a single in-process
//! tool or to a whole [`ToolSource`].

use armature_core::{Tool, ToolError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ToolConfig;
use crate::error::{RegistryError, SourceError};
use crate::source::ToolSource;

/// Builds one in-process tool from its configured name and entry.
pub type ToolFactory =
    Arc<dyn Fn(&str, &ToolConfig) -> Result<Arc<dyn Tool>, ToolError> + Send + Sync>;

/// Builds a tool source from its configured name and entry.
pub type SourceFactory =
    Arc<dyn Fn(&str, &ToolConfig) -> Result<Arc<dyn ToolSource>, SourceError> + Send + Sync>;

/// What a type tag resolves to.
#[derive(Clone)]
pub enum Factory {
    Tool(ToolFactory),
    Source(SourceFactory),
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Tool(_) => f.write_str("Factory::Tool"),
            Factory::Source(_) => f.write_str("Factory::Source"),
        }
    }
}

/// Registration table mapping type tags to factories.
#[derive(Debug, Clone, Default)]
pub struct ToolFactoryTable {
    factories: HashMap<String, Factory>,
}

impl ToolFactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for an in-process tool type. A later registration
    /// for the same tag replaces the earlier one.
    pub fn register_tool<F>(&mut self, tool_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &ToolConfig) -> Result<Arc<dyn Tool>, ToolError> + Send + Sync + 'static,
    {
        self.factories
            .insert(tool_type.into(), Factory::Tool(Arc::new(factory)));
        self
    }

    /// Register a factory for a tool source type.
    pub fn register_source<F>(&mut self, source_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &ToolConfig) -> Result<Arc<dyn ToolSource>, SourceError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(source_type.into(), Factory::Source(Arc::new(factory)));
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Factory> {
        self.factories.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build an in-process tool.
    pub fn create_tool(&self, name: &str, config: &ToolConfig) -> Result<Arc<dyn Tool>, RegistryError> {
        match self.factories.get(&config.tool_type) {
            Some(Factory::Tool(factory)) => Ok(factory(name, config)?),
            Some(Factory::Source(_)) => Err(RegistryError::Config(format!(
                "type '{}' of '{}' builds a tool source, not a tool",
                config.tool_type, name
            ))),
            None => Err(self.unknown(name, config)),
        }
    }

    /// Build a tool source.
    pub fn create_source(
        &self,
        name: &str,
        config: &ToolConfig,
    ) -> Result<Arc<dyn ToolSource>, RegistryError> {
        match self.factories.get(&config.tool_type) {
            Some(Factory::Source(factory)) => Ok(factory(name, config)?),
            Some(Factory::Tool(_)) => Err(RegistryError::Config(format!(
                "type '{}' of '{}' builds a tool, not a tool source",
                config.tool_type, name
            ))),
            None => Err(self.unknown(name, config)),
        }
    }

    fn unknown(&self, name: &str, config: &ToolConfig) -> RegistryError {
        RegistryError::UnknownToolType {
            tool: name.to_string(),
            tool_type: config.tool_type.clone(),
        }
    }
}

//! In-process tool source.

use armature_core::{CancellationToken, Tool, ToolDescriptor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SourceError;
use crate::source::ToolSource;

/// Source type tag for [`LocalSource`].
pub const LOCAL_SOURCE_KIND: &str = "local";

/// A source holding tools constructed in-process.
///
/// Discovery is a no-op; tools are added and removed explicitly. Concurrent
/// registration is safe and duplicate names are rejected without touching the
/// existing entry.
pub struct LocalSource {
    name: String,
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl LocalSource {
    /// Create an empty source. An empty name falls back to `"local"`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.is_empty() {
            name = LOCAL_SOURCE_KIND.to_string();
        }
        Self {
            name,
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Add a tool.
    ///
    /// # Errors
    ///
    /// Fails if a tool with the same name is already registered or the tool's
    /// descriptor is invalid.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), SourceError> {
        tool.descriptor().validate()?;
        let name = tool.name().to_string();

        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(SourceError::DuplicateTool {
                source_name: self.name.clone(),
                tool: name,
            });
        }
        debug!(source = %self.name, tool = %name, "Registered local tool");
        tools.insert(name, tool);
        Ok(())
    }

    /// Builder-style registration for setup code.
    pub async fn with_tool(self, tool: Arc<dyn Tool>) -> Result<Self, SourceError> {
        self.register_tool(tool).await?;
        Ok(self)
    }

    /// Remove a tool by name.
    pub async fn remove_tool(&self, name: &str) -> Result<(), SourceError> {
        let mut tools = self.tools.write().await;
        match tools.remove(name) {
            Some(_) => Ok(()),
            None => Err(SourceError::ToolNotFound {
                source_name: self.name.clone(),
                tool: name.to_string(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }
}

#[async_trait]
impl ToolSource for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        LOCAL_SOURCE_KIND
    }

    async fn discover_tools(&self, _cancel: &CancellationToken) -> Result<(), SourceError> {
        Ok(())
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().await;
        tools
            .values()
            .map(|tool| {
                let mut descriptor = tool.descriptor().clone();
                descriptor.source = self.name.clone();
                descriptor
            })
            .collect()
    }

    async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }
}

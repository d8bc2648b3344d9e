//! Tool source capability.

use armature_core::{CancellationToken, Tool, ToolDescriptor};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SourceError;

/// A provider that enumerates and hands out tools.
///
/// Sources are either static (tools registered in-process) or backed by a
/// remote server whose tool list is discovered over the network.
///
/// `discover_tools` replaces the whole tool set and is idempotent. On failure
/// the previous tool set stays in place, so a transient network error never
/// leaves a source empty.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Unique source name.
    fn name(&self) -> &str;

    /// Source type tag, e.g. `"local"` or `"mcp"`.
    fn kind(&self) -> &str;

    /// Refresh the tool set from the provider.
    async fn discover_tools(&self, cancel: &CancellationToken) -> Result<(), SourceError>;

    /// Descriptors of every tool currently offered.
    async fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Look up a tool by name.
    async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;
}

//! # Armature
//!
//! Tool plumbing for agent runtimes. Tools come from pluggable sources,
//! are merged into one [`ToolRegistry`] namespace and can be executed
//! normally or streamed through a [`StreamingOrchestrator`].
//!
//! ## Crates
//!
//! - [`core`]: the [`Tool`] and [`StreamingTool`] traits, descriptors, results
//! - [`tools`]: sources, registry, configuration and the factory table
//! - [`mcp`]: remote tools served over MCP (feature `mcp`)
//! - [`agent`]: the `agent_call` delegation tool (feature `agent`)
//! - [`observability`]: metrics and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature::{CancellationToken, ToolFactoryTable, ToolRegistry, ToolsConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ToolsConfig::load_from_file("armature.toml")?;
//! let factories = armature::default_factories();
//! let registry = ToolRegistry::from_config(&config, &factories, &CancellationToken::new()).await?;
//!
//! for tool in registry.list_tools_filtered(true).await {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! # Ok(())
//! # }
//! ```

pub use armature_core as core;
pub use armature_observability as observability;
pub use armature_tools as tools;

#[cfg(feature = "agent")]
pub use armature_agent as agent;
#[cfg(feature = "mcp")]
pub use armature_mcp as mcp;

pub use armature_core::{
    CancellationToken, ParameterDescriptor, ParameterType, StreamingTool, Tool, ToolArgs,
    ToolDescriptor, ToolError, ToolResult,
};
pub use armature_tools::{
    ChunkSink, LocalSource, RegistryError, SourceError, StreamingOrchestrator, ToolConfig,
    ToolFactoryTable, ToolRegistry, ToolSource, ToolsConfig,
};

#[cfg(feature = "agent")]
pub use armature_agent::{AgentDirectory, AgentHandle, DelegationTool, InMemoryAgentDirectory};
#[cfg(feature = "mcp")]
pub use armature_mcp::{McpToolSource, McpToolSourceBuilder};

/// Factory table with the `mcp` source tag registered.
///
/// The `agent_call` tag needs an agent directory; add it with
/// [`agent::register_factory`] once one exists.
pub fn default_factories() -> ToolFactoryTable {
    #[allow(unused_mut)]
    let mut table = ToolFactoryTable::new();
    #[cfg(feature = "mcp")]
    armature_mcp::register_factory(&mut table);
    table
}

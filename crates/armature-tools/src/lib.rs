//! # Armature Tools
//!
//! Tool sources, the [`ToolRegistry`] that merges them into one namespace,
//! the type-tag [`ToolFactoryTable`], configuration, and the
//! [`StreamingOrchestrator`].
//!
//! ```rust,no_run
//! use armature_tools::{LocalSource, ToolRegistry};
//! use armature_core::CancellationToken;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ToolRegistry::new();
//! let local = Arc::new(LocalSource::new("builtin"));
//! registry.register_source(local, &CancellationToken::new()).await?;
//! for tool in registry.list_tools().await {
//!     println!("{} ({})", tool.name, tool.source);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod local;
pub mod registry;
pub mod source;
pub mod streaming;

pub use config::{ToolConfig, ToolsConfig};
pub use error::{RegistryError, RegistryResult, SourceError};
pub use factory::{Factory, SourceFactory, ToolFactory, ToolFactoryTable};
pub use local::{LOCAL_SOURCE_KIND, LocalSource};
pub use registry::{DiscoveryReport, SourceOptions, ToolEntry, ToolRegistry};
pub use source::ToolSource;
pub use streaming::{
    ChannelSink, ChunkSink, DEFAULT_CHUNK_BUFFER, SinkError, StreamingError, StreamingOrchestrator,
};

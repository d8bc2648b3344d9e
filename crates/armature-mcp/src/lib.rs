//! # Armature MCP
//!
//! A [`ToolSource`](armature_tools::ToolSource) for servers speaking the
//! Model Context Protocol over HTTP.
//!
//! ## Protocol
//!
//! | Method       | Used for                                   |
//! |--------------|--------------------------------------------|
//! | `initialize` | Handshake before listing; failure tolerated |
//! | `tools/list` | Discovery                                  |
//! | `tools/call` | Execution                                  |
//!
//! Responses may be plain JSON or a `text/event-stream`; both are accepted.
//! A `mcp-session-id` response header is stored and echoed on every later
//! request from the same source.
//!
//! Tool failures are detected heuristically, see [`classify`].
//!
//! ```rust,no_run
//! use armature_mcp::McpToolSource;
//! use armature_tools::ToolRegistry;
//! use armature_core::CancellationToken;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = McpToolSource::builder("http://localhost:8080/mcp")
//!     .name("files")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let registry = ToolRegistry::new();
//! registry.register_source(Arc::new(source), &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod source;
pub mod sse;
pub mod transport;

pub use classify::{CallOutcome, classify, extract_content};
pub use error::{McpError, McpResult};
pub use protocol::{PROTOCOL_VERSION, SESSION_HEADER};
pub use schema::{normalize_items, parameters_from_schema};
pub use source::{
    DEFAULT_SSE_TIMEOUT, MCP_SOURCE_KIND, McpTool, McpToolSource, McpToolSourceBuilder,
    register_factory,
};
pub use transport::{HttpTransport, HttpTransportConfig};

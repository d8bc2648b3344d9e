//! # Armature Core
//!
//! Capability traits and data types shared by every Armature crate: the
//! [`Tool`] and [`StreamingTool`] traits, tool and parameter descriptors, the
//! uniform [`ToolResult`], and [`ToolError`].

pub mod descriptor;
pub mod error;
pub mod result;
pub mod tool;

pub use descriptor::{ParameterDescriptor, ParameterType, ToolDescriptor, default_array_items};
pub use error::ToolError;
pub use result::ToolResult;
pub use tool::{StreamingTool, Tool, ToolArgs};

pub use tokio_util::sync::CancellationToken;

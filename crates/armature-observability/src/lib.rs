//! Armature Observability
//!
//! Tool execution metrics and structured tracing. Recording is best-effort:
//! nothing in this crate is allowed to change the outcome of a tool call.

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod trace;

#[cfg(feature = "metrics")]
pub use metrics::{MetricsError, Outcome, ToolMetrics};

pub use trace::tool_span;

#[cfg(feature = "tracing")]
pub use trace::init_tracing;

use serde::{Deserialize, Serialize};

/// Standard latency buckets for tool execution histograms.
/// Covers a few milliseconds up to slow remote calls.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.01,  // 10ms
    0.05,  // 50ms
    0.1,   // 100ms
    0.25,  // 250ms
    0.5,   // 500ms
    1.0,   // 1s
    2.5,   // 2.5s
    5.0,   // 5s
    10.0,  // 10s
    30.0,  // 30s
    60.0,  // 1m
];

/// Log output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Metrics namespace prefix
    pub namespace: String,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            namespace: "armature".to_string(),
            default_filter: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

/// Observability framework errors
#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[cfg(feature = "metrics")]
    #[error("Metrics error: {0}")]
    Metrics(#[from] metrics::MetricsError),
}

//! Tool execution metrics.
//!
//! Each [`ToolMetrics`] owns its own Prometheus [`Registry`], so several
//! registries (and tests) can coexist in one process without name clashes.

use crate::LATENCY_BUCKETS;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;
use thiserror::Error;

/// Outcome label recorded for an execution or discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Prometheus collectors for tool execution and discovery.
#[derive(Debug, Clone)]
pub struct ToolMetrics {
    registry: Registry,
    tool_exec_total: CounterVec,              // labels: tool, outcome
    tool_exec_duration_seconds: HistogramVec, // labels: tool
    tool_discovery_total: CounterVec,         // labels: source, outcome
}

impl ToolMetrics {
    /// Create and register the collectors under `namespace`.
    pub fn new(namespace: &str) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let tool_exec_total = CounterVec::new(
            Opts::new(
                format!("{}_tool_exec_total", namespace),
                "Total number of tool executions by tool and outcome",
            ),
            &["tool", "outcome"],
        )?;

        let tool_exec_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{}_tool_exec_duration_seconds", namespace),
                "Tool execution duration in seconds by tool",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["tool"],
        )?;

        let tool_discovery_total = CounterVec::new(
            Opts::new(
                format!("{}_tool_discovery_total", namespace),
                "Total number of tool discovery passes by source and outcome",
            ),
            &["source", "outcome"],
        )?;

        registry.register(Box::new(tool_exec_total.clone()))?;
        registry.register(Box::new(tool_exec_duration_seconds.clone()))?;
        registry.register(Box::new(tool_discovery_total.clone()))?;

        Ok(Self {
            registry,
            tool_exec_total,
            tool_exec_duration_seconds,
            tool_discovery_total,
        })
    }

    /// Record one tool execution.
    pub fn record_tool_execution(&self, tool: &str, duration: Duration, outcome: Outcome) {
        self.tool_exec_total
            .with_label_values(&[tool, outcome.as_str()])
            .inc();
        self.tool_exec_duration_seconds
            .with_label_values(&[tool])
            .observe(duration.as_secs_f64());
    }

    /// Record one discovery pass for a source.
    pub fn record_discovery(&self, source: &str, outcome: Outcome) {
        self.tool_discovery_total
            .with_label_values(&[source, outcome.as_str()])
            .inc();
    }

    /// Number of recorded executions of `tool` with `outcome`.
    pub fn tool_exec_count(&self, tool: &str, outcome: Outcome) -> u64 {
        self.tool_exec_total
            .with_label_values(&[tool, outcome.as_str()])
            .get() as u64
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every collector in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

/// Metrics system errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    Encoding(String),
}

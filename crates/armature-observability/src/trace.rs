//! Structured tracing for tool execution.

#[cfg(feature = "tracing")]
use crate::{LogFormat, ObservabilityConfig, ObservabilityError};

/// Span wrapping a single tool execution.
pub fn tool_span(tool_name: &str, source: &str) -> tracing::Span {
    tracing::info_span!(
        "tool_execution",
        tool.name = %tool_name,
        tool.source = %source,
        otel.name = "tool_execution"
    )
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over [`ObservabilityConfig::default_filter`]. Fails if a
/// global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
    };
    result.map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    tracing::debug!(
        namespace = %config.namespace,
        format = ?config.log_format,
        "Initialized structured tracing"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_span_is_named_tool_execution() {
        let span = tool_span("search", "local");
        // Disabled without a subscriber, but the metadata is still attached.
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "tool_execution");
            assert!(metadata.fields().field("tool.name").is_some());
        }
    }
}

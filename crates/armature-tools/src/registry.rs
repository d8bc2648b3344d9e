//! Tool registry: one namespace over many tool sources.

use armature_core::{
    CancellationToken, StreamingTool, Tool, ToolArgs, ToolDescriptor, ToolError, ToolResult,
};
use armature_observability::{Outcome, ToolMetrics, tool_span};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{Instrument, debug, info, warn};

use crate::error::{RegistryError, RegistryResult, SourceError};
use crate::source::ToolSource;
use crate::streaming::{ChunkSink, StreamingError, StreamingOrchestrator};

/// A registered tool bound to the source that produced it.
#[derive(Clone)]
pub struct ToolEntry {
    pub tool: Arc<dyn Tool>,
    pub source: Arc<dyn ToolSource>,
    /// Type tag of the owning source.
    pub source_kind: String,
    /// Hidden from listings shown to the model.
    pub internal: bool,
}

impl ToolEntry {
    fn new(tool: Arc<dyn Tool>, source: &Arc<dyn ToolSource>, internal: bool) -> Self {
        Self {
            tool,
            source: Arc::clone(source),
            source_kind: source.kind().to_string(),
            internal,
        }
    }

    /// Descriptor with the owning source filled in.
    pub fn descriptor(&self) -> ToolDescriptor {
        let mut descriptor = self.tool.descriptor().clone();
        descriptor.source = self.source.name().to_string();
        descriptor
    }
}

/// Per-source registration options.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Mark every tool of the source as internal.
    pub internal: bool,
    /// Mark only these tools as internal.
    pub internal_tools: HashSet<String>,
}

impl SourceOptions {
    pub fn internal() -> Self {
        Self {
            internal: true,
            internal_tools: HashSet::new(),
        }
    }

    fn is_internal(&self, tool: &str) -> bool {
        self.internal || self.internal_tools.contains(tool)
    }
}

struct RegisteredSource {
    source: Arc<dyn ToolSource>,
    options: SourceOptions,
}

/// Outcome of [`ToolRegistry::discover_all`].
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Sources whose discovery succeeded, in registration order.
    pub refreshed: Vec<String>,
    /// Sources whose discovery failed. Their previous tools are kept.
    pub failed: Vec<(String, SourceError)>,
    /// Tools skipped because an earlier source already offers the name.
    pub conflicts: Vec<RegistryError>,
    /// Number of tools registered after the pass.
    pub tool_count: usize,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.conflicts.is_empty()
    }
}

/// Aggregates tool sources into a single tool namespace.
///
/// The registry is what the agent runtime sees: it lists tools and executes
/// them by name regardless of which source provides them.
///
/// Name conflicts are handled differently depending on the path:
///
/// * [`register_source`](Self::register_source) is initial setup and fails
///   loudly. A conflicting source is rejected as a whole.
/// * [`discover_all`](Self::discover_all) is background refresh and must keep
///   working. The first-registered source keeps the name and the later tool is
///   skipped with a warning.
///
/// Reads see either the namespace before or after a refresh, never a mix.
/// Tool execution is not serialized.
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, ToolEntry>>,
    sources: RwLock<Vec<RegisteredSource>>,
    // Serializes register/remove/discover so a refresh cannot drop a source
    // registered while it was running.
    mutation: Mutex<()>,
    metrics: Option<ToolMetrics>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty registry without metrics.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sources: RwLock::new(Vec::new()),
            mutation: Mutex::new(()),
            metrics: None,
        }
    }

    /// Record execution and discovery metrics into `metrics`.
    pub fn with_metrics(mut self, metrics: ToolMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&ToolMetrics> {
        self.metrics.as_ref()
    }

    /// Register a source and every tool it discovers.
    ///
    /// # Parameters
    ///
    /// * `source` - The source to add; its name must be non-empty and unused
    /// * `cancel` - Cancels the source's discovery
    ///
    /// # Returns
    ///
    /// The number of tools registered from the source.
    ///
    /// # Errors
    ///
    /// Fails if discovery fails or any discovered tool name is already taken.
    /// In both cases none of the source's tools are registered.
    pub async fn register_source(
        &self,
        source: Arc<dyn ToolSource>,
        cancel: &CancellationToken,
    ) -> RegistryResult<usize> {
        self.register_source_with(source, SourceOptions::default(), cancel)
            .await
    }

    /// [`register_source`](Self::register_source) with explicit options.
    pub async fn register_source_with(
        &self,
        source: Arc<dyn ToolSource>,
        options: SourceOptions,
        cancel: &CancellationToken,
    ) -> RegistryResult<usize> {
        let source_name = source.name().to_string();
        if source_name.is_empty() {
            return Err(RegistryError::EmptySourceName);
        }

        let _guard = self.mutation.lock().await;

        if self
            .sources
            .read()
            .await
            .iter()
            .any(|registered| registered.source.name() == source_name)
        {
            return Err(RegistryError::DuplicateSource(source_name));
        }

        let discovered = source.discover_tools(cancel).await;
        self.record_discovery(&source_name, discovered.is_ok());
        discovered?;

        let tools = collect_tools(&source).await;

        let mut entries = self.entries.write().await;
        if let Some((name, _)) = tools.iter().find(|(name, _)| entries.contains_key(name)) {
            let existing_source = entries
                .get(name)
                .map(|entry| entry.source.name().to_string())
                .unwrap_or_default();
            return Err(RegistryError::ToolConflict {
                tool: name.clone(),
                existing_source,
                new_source: source_name,
            });
        }

        let count = tools.len();
        for (name, tool) in tools {
            let entry = ToolEntry::new(tool, &source, options.is_internal(&name));
            entries.insert(name, entry);
        }
        drop(entries);

        info!(
            source = %source_name,
            kind = %source.kind(),
            tools = count,
            "Registered tool source"
        );
        self.sources
            .write()
            .await
            .push(RegisteredSource { source, options });
        Ok(count)
    }

    /// Re-run discovery on every registered source and rebuild the namespace.
    ///
    /// A failing source is logged and keeps its previous tools; the other
    /// sources are still refreshed. When two sources offer the same tool
    /// name, the one registered first wins and the later tool is skipped with
    /// a warning.
    pub async fn discover_all(&self, cancel: &CancellationToken) -> DiscoveryReport {
        let _guard = self.mutation.lock().await;

        let sources: Vec<(Arc<dyn ToolSource>, SourceOptions)> = self
            .sources
            .read()
            .await
            .iter()
            .map(|registered| (Arc::clone(&registered.source), registered.options.clone()))
            .collect();

        let mut report = DiscoveryReport::default();
        let mut rebuilt: HashMap<String, ToolEntry> = HashMap::new();

        for (source, options) in &sources {
            let source_name = source.name().to_string();
            match source.discover_tools(cancel).await {
                Ok(()) => {
                    self.record_discovery(&source_name, true);
                    report.refreshed.push(source_name.clone());
                }
                Err(e) => {
                    self.record_discovery(&source_name, false);
                    warn!(
                        source = %source_name,
                        error = %e,
                        "Tool discovery failed, keeping previous tools"
                    );
                    report.failed.push((source_name.clone(), e));
                }
            }

            for (name, tool) in collect_tools(source).await {
                if let Some(existing) = rebuilt.get(&name) {
                    warn!(
                        tool = %name,
                        existing_source = %existing.source.name(),
                        skipped_source = %source_name,
                        "Tool name conflict, skipping"
                    );
                    report.conflicts.push(RegistryError::ToolConflict {
                        tool: name,
                        existing_source: existing.source.name().to_string(),
                        new_source: source_name.clone(),
                    });
                    continue;
                }
                let entry = ToolEntry::new(tool, source, options.is_internal(&name));
                rebuilt.insert(name, entry);
            }
        }

        report.tool_count = rebuilt.len();
        *self.entries.write().await = rebuilt;

        info!(
            sources = sources.len(),
            tools = report.tool_count,
            failed = report.failed.len(),
            conflicts = report.conflicts.len(),
            "Rediscovered tool sources"
        );
        report
    }

    /// Remove a source and every tool it owns.
    ///
    /// # Returns
    ///
    /// The number of tools removed.
    pub async fn remove_source(&self, name: &str) -> RegistryResult<usize> {
        let _guard = self.mutation.lock().await;

        let mut sources = self.sources.write().await;
        let Some(position) = sources
            .iter()
            .position(|registered| registered.source.name() == name)
        else {
            return Err(RegistryError::SourceNotFound(name.to_string()));
        };
        sources.remove(position);
        drop(sources);

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.source.name() != name);
        let removed = before - entries.len();

        info!(source = %name, tools = removed, "Removed tool source");
        Ok(removed)
    }

    pub async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|entry| Arc::clone(&entry.tool))
    }

    pub async fn get_entry(&self, name: &str) -> Option<ToolEntry> {
        self.entries.read().await.get(name).cloned()
    }

    /// Streaming view of a tool, if the tool supports it.
    pub async fn get_streaming_tool(&self, name: &str) -> Option<Arc<dyn StreamingTool>> {
        self.get_tool(name).await.and_then(|tool| tool.streaming())
    }

    /// Source that provides the named tool.
    pub async fn get_tool_source(&self, name: &str) -> Option<Arc<dyn ToolSource>> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|entry| Arc::clone(&entry.source))
    }

    /// Descriptors of every tool, sorted by name.
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.list_tools_filtered(false).await
    }

    /// Descriptors sorted by name, optionally without internal tools.
    pub async fn list_tools_filtered(&self, exclude_internal: bool) -> Vec<ToolDescriptor> {
        let entries = self.entries.read().await;
        let mut descriptors: Vec<ToolDescriptor> = entries
            .values()
            .filter(|entry| !(exclude_internal && entry.internal))
            .map(ToolEntry::descriptor)
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Descriptors grouped by source name, each group sorted by tool name.
    pub async fn list_tools_by_source(&self) -> BTreeMap<String, Vec<ToolDescriptor>> {
        let mut grouped: BTreeMap<String, Vec<ToolDescriptor>> = BTreeMap::new();
        for descriptor in self.list_tools().await {
            grouped
                .entry(descriptor.source.clone())
                .or_default()
                .push(descriptor);
        }
        grouped
    }

    /// Sorted tool names.
    pub async fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Source names in registration order.
    pub async fn source_names(&self) -> Vec<String> {
        self.sources
            .read()
            .await
            .iter()
            .map(|registered| registered.source.name().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// The call runs inside a `tool_execution` span and its duration and
    /// outcome are recorded as metrics. Neither affects the result.
    ///
    /// # Errors
    ///
    /// [`ToolError::NotFound`] with the available names if no tool matches,
    /// otherwise whatever the tool raised.
    pub async fn execute_tool(
        &self,
        name: &str,
        args: ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        let Some(entry) = self.get_entry(name).await else {
            let available = self.tool_names().await;
            warn!(tool = %name, "Tool not found");
            return Err(ToolError::not_found(name, available));
        };

        let span = tool_span(name, entry.source.name());
        async {
            let start = Instant::now();
            let outcome = entry.tool.execute(args, cancel).await;
            let duration = start.elapsed();

            let success = matches!(&outcome, Ok(result) if result.success);
            if let Some(metrics) = &self.metrics {
                metrics.record_tool_execution(name, duration, Outcome::from_success(success));
            }

            match &outcome {
                Ok(result) if result.success => {
                    debug!(duration_ms = duration.as_millis() as u64, "Tool executed")
                }
                Ok(result) => warn!(error = %result.error, "Tool reported failure"),
                Err(e) => warn!(error = %e, code = e.error_code(), "Tool execution failed"),
            }

            outcome.map(|mut result| {
                if result.execution_duration.is_zero() {
                    result.execution_duration = duration;
                }
                if result.tool_name.is_empty() {
                    result.tool_name = name.to_string();
                }
                result
            })
        }
        .instrument(span)
        .await
    }

    /// Stream a tool by name through a [`StreamingOrchestrator`].
    ///
    /// Runs inside the same `tool_execution` span and records the same
    /// metrics as [`execute_tool`](Self::execute_tool); a cancelled or
    /// abandoned stream counts as a failure. Returns `None` when no tool
    /// named `name` supports streaming.
    pub async fn execute_streaming<S>(
        &self,
        name: &str,
        args: ToolArgs,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Option<Result<ToolResult, StreamingError>>
    where
        S: ChunkSink + ?Sized,
    {
        let entry = self.get_entry(name).await?;
        let tool = Arc::clone(&entry.tool).streaming()?;

        let span = tool_span(name, entry.source.name());
        let outcome = async {
            let start = Instant::now();
            let outcome = StreamingOrchestrator::new(tool)
                .execute(args, cancel, sink)
                .await;
            let duration = start.elapsed();

            let success = matches!(&outcome, Ok(result) if result.success);
            if let Some(metrics) = &self.metrics {
                metrics.record_tool_execution(name, duration, Outcome::from_success(success));
            }
            match &outcome {
                Ok(result) if result.success => {
                    debug!(duration_ms = duration.as_millis() as u64, "Tool streamed")
                }
                Ok(result) => warn!(error = %result.error, "Tool reported failure"),
                Err(e) => warn!(error = %e, "Streaming execution ended early"),
            }
            outcome
        }
        .instrument(span)
        .await;
        Some(outcome)
    }

    fn record_discovery(&self, source: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_discovery(source, Outcome::from_success(success));
        }
    }
}

/// Resolve every listed descriptor of `source` to its tool instance.
async fn collect_tools(source: &Arc<dyn ToolSource>) -> Vec<(String, Arc<dyn Tool>)> {
    let mut tools = Vec::new();
    for descriptor in source.list_tools().await {
        match source.get_tool(&descriptor.name).await {
            Some(tool) => tools.push((descriptor.name, tool)),
            None => warn!(
                source = %source.name(),
                tool = %descriptor.name,
                "Tool listed but not available"
            ),
        }
    }
    tools
}

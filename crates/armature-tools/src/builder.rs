//! Build a registry from configuration.

use armature_core::CancellationToken;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ToolsConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::factory::{Factory, ToolFactoryTable};
use crate::local::LocalSource;
use crate::registry::{SourceOptions, ToolRegistry};

impl ToolRegistry {
    /// Populate `self` from configuration.
    ///
    /// Source-type entries (for example `mcp`) are registered one by one. An
    /// entry that is disabled, has no `server_url`, or fails to register is
    /// logged and skipped so one unreachable server does not block startup.
    /// Tool-type entries are built through their factory and registered
    /// together in a single local source named `local`.
    ///
    /// # Errors
    ///
    /// Unknown type tags, invalid durations and tool factory failures are
    /// configuration mistakes and abort the build.
    pub async fn load_config(
        &self,
        config: &ToolsConfig,
        factories: &ToolFactoryTable,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        let local = Arc::new(LocalSource::new("local"));
        let mut internal_tools = HashSet::new();

        for (name, entry) in &config.tools {
            if !entry.enabled {
                info!(tool = %name, "Skipping disabled tool");
                continue;
            }

            match factories.get(&entry.tool_type) {
                Some(Factory::Source(_)) => {
                    if entry.server_url().is_none() {
                        warn!(source = %name, kind = %entry.tool_type, "Skipping source without server_url");
                        continue;
                    }
                    let source = match factories.create_source(name, entry) {
                        Ok(source) => source,
                        Err(e) => {
                            warn!(source = %name, error = %e, "Failed to create tool source, skipping");
                            continue;
                        }
                    };
                    let options = SourceOptions {
                        internal: entry.internal,
                        internal_tools: HashSet::new(),
                    };
                    if let Err(e) = self.register_source_with(source, options, cancel).await {
                        warn!(source = %name, error = %e, "Failed to register tool source, skipping");
                    }
                }
                Some(Factory::Tool(_)) => {
                    let tool = factories.create_tool(name, entry)?;
                    local.register_tool(tool).await?;
                    if entry.internal {
                        internal_tools.insert(name.clone());
                    }
                }
                None => {
                    return Err(RegistryError::UnknownToolType {
                        tool: name.clone(),
                        tool_type: entry.tool_type.clone(),
                    });
                }
            }
        }

        if !local.is_empty().await {
            let options = SourceOptions {
                internal: false,
                internal_tools,
            };
            self.register_source_with(local, options, cancel).await?;
        }
        Ok(())
    }

    /// Build a new registry from configuration.
    ///
    /// See [`load_config`](Self::load_config).
    pub async fn from_config(
        config: &ToolsConfig,
        factories: &ToolFactoryTable,
        cancel: &CancellationToken,
    ) -> RegistryResult<Self> {
        let registry = Self::new();
        registry.load_config(config, factories, cancel).await?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::error::SourceError;
    use crate::source::ToolSource;
    use armature_core::{Tool, ToolArgs, ToolDescriptor, ToolError, ToolResult};
    use async_trait::async_trait;

    struct Fixed {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(
            &self,
            _args: ToolArgs,
            _cancel: &CancellationToken,
        ) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(self.name(), "ok"))
        }
    }

    /// Remote-style source whose discovery always fails.
    struct Unreachable(String);

    #[async_trait]
    impl ToolSource for Unreachable {
        fn name(&self) -> &str {
            &self.0
        }

        fn kind(&self) -> &str {
            "remote"
        }

        async fn discover_tools(&self, _cancel: &CancellationToken) -> Result<(), SourceError> {
            Err(SourceError::discovery(&self.0, "connection refused"))
        }

        async fn list_tools(&self) -> Vec<ToolDescriptor> {
            Vec::new()
        }

        async fn get_tool(&self, _name: &str) -> Option<Arc<dyn Tool>> {
            None
        }
    }

    fn factories() -> ToolFactoryTable {
        let mut table = ToolFactoryTable::new();
        table
            .register_tool("fixed", |name, config| {
                let description = config.description.clone().unwrap_or_default();
                Ok(Arc::new(Fixed {
                    descriptor: ToolDescriptor::new(name, description),
                }))
            })
            .register_source("remote", |name, _config| Ok(Arc::new(Unreachable(name.to_string()))));
        table
    }

    #[tokio::test]
    async fn builds_local_tools_and_skips_bad_sources() {
        let mut config = ToolsConfig::default();
        config.tools.insert("alpha".into(), ToolConfig::new("fixed"));
        config
            .tools
            .insert("helper".into(), ToolConfig::new("fixed").internal());
        config
            .tools
            .insert("off".into(), ToolConfig::new("fixed").disabled());
        config.tools.insert(
            "down".into(),
            ToolConfig::new("remote").with_server_url("http://127.0.0.1:9"),
        );
        config.tools.insert("nourl".into(), ToolConfig::new("remote"));

        let registry = ToolRegistry::from_config(&config, &factories(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(registry.tool_names().await, vec!["alpha", "helper"]);
        assert_eq!(registry.source_names().await, vec!["local"]);
        let visible = registry.list_tools_filtered(true).await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "alpha");
    }

    #[tokio::test]
    async fn unknown_type_aborts() {
        let mut config = ToolsConfig::default();
        config.tools.insert("x".into(), ToolConfig::new("teleport"));

        let err = ToolRegistry::from_config(&config, &factories(), &CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::UnknownToolType { .. }));
    }
}

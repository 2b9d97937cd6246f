//! Installing missing tools with the Go toolchain.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ToolError, ToolResult};
use crate::host::{ExecOptions, LocatorOptions, PackageSpec, ProcessExecutor, ToolInstaller, ToolLocator};
use crate::tools::GO;

use super::LOG_TARGET;

/// Installs packages with `go install <package>@latest`.
pub struct GoInstaller {
    locator: Arc<dyn ToolLocator>,
    executor: Arc<dyn ProcessExecutor>,
}

impl std::fmt::Debug for GoInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoInstaller").finish_non_exhaustive()
    }
}

impl GoInstaller {
    pub fn new(locator: Arc<dyn ToolLocator>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { locator, executor }
    }

    async fn go_binary(&self) -> ToolResult<PathBuf> {
        self.locator
            .find_tool(GO, &LocatorOptions::default())
            .await
            .ok_or_else(|| ToolError::tool_not_found(GO))
    }
}

/// `go install` arguments for a package.
pub fn install_args(spec: &PackageSpec) -> Vec<String> {
    vec!["install".to_string(), format!("{}@latest", spec.package_path)]
}

#[async_trait]
impl ToolInstaller for GoInstaller {
    async fn get(&self, spec: &PackageSpec) -> ToolResult<()> {
        let go = self.go_binary().await?;
        log::info!(
            target: LOG_TARGET,
            "Installing {} ({:?}) with {}",
            spec.package_path,
            spec.kind,
            go.display()
        );

        let output = self
            .executor
            .exec(&go, &install_args(spec), ExecOptions::default())
            .await?;
        if output.exit_code != 0 {
            return Err(ToolError::install_failure(
                &spec.package_name,
                output.stderr.trim(),
            ));
        }
        log::info!(target: LOG_TARGET, "Installed {}", spec.package_name);
        Ok(())
    }
}

//! Per-project cache of resolved tool locations.
//!
//! `ToolResolutionCache` maps `(tool name, project root)` to the absolute path
//! the locator resolved for it. The whole table is rebuilt at once and swapped
//! in atomically, so readers see either the previous or the next complete
//! table and never a partially filled one.
//!
//! ## Lifecycle
//!
//! ```text
//!  set_project_roots ──► rebuild ──► (all locator queries settle) ──► swap table
//!                           │
//!                           └─ already rebuilding? ──► AlreadyRunning (no-op)
//!
//!  ensure_available(tool)
//!      ├─ cached / found by locator ──► Available (+ rebuild)
//!      ├─ installer already tried    ──► AlreadyAttempted
//!      └─ installer.get(package)     ──► Installed (+ rebuild) | InstallFailed
//! ```

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::guard::{AttemptedSet, FlightFlag};
use crate::host::{Document, LocatorOptions, PackageSpec, ToolInstaller, ToolLocator};

use super::project::{RootKey, local_roots, project_root_for};

const LOG_TARGET: &str = "toolwright::cache";

type ToolTable = HashMap<(String, RootKey), PathBuf>;

/// Result of a [`ToolResolutionCache::rebuild`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// The table was replaced; `entries` tools were found.
    Rebuilt { entries: usize },
    /// Another rebuild was in flight; this call did nothing.
    AlreadyRunning,
    /// The resolution batch failed; the previous table is kept.
    Failed,
}

/// Result of a [`ToolResolutionCache::ensure_available`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The tool resolves.
    Available(PathBuf),
    /// A rebuild is in flight; try again once it settles.
    NotReady,
    /// The installer already ran for this tool during this session.
    AlreadyAttempted,
    /// No installer is configured.
    NoInstaller,
    /// The tool has no installable package.
    NotInstallable,
    /// The installer succeeded and the cache was rebuilt.
    Installed,
    /// The installer reported failure.
    InstallFailed,
}

/// Cache of resolved tool paths keyed by tool name and project root.
pub struct ToolResolutionCache {
    tools: Vec<String>,
    locator: Arc<dyn ToolLocator>,
    installer: Option<Arc<dyn ToolInstaller>>,
    packages: HashMap<String, PackageSpec>,
    roots: ArcSwap<Vec<PathBuf>>,
    table: ArcSwap<ToolTable>,
    rebuilding: FlightFlag,
    install_attempted: AttemptedSet<String>,
}

impl std::fmt::Debug for ToolResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolResolutionCache")
            .field("tools", &self.tools)
            .field("roots", &self.roots.load())
            .field("entries", &self.table.load().len())
            .field("rebuilding", &self.rebuilding.is_set())
            .finish()
    }
}

impl ToolResolutionCache {
    /// Create an empty cache for the given tool names.
    pub fn new(tools: &[&str], locator: Arc<dyn ToolLocator>) -> Self {
        Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            locator,
            installer: None,
            packages: HashMap::new(),
            roots: ArcSwap::new(Arc::new(Vec::new())),
            table: ArcSwap::new(Arc::new(HashMap::new())),
            rebuilding: FlightFlag::new(),
            install_attempted: AttemptedSet::new(),
        }
    }

    /// Enable installation of missing tools. `packages` are keyed by their
    /// `package_name`, which must match the tool name.
    pub fn with_installer(
        mut self,
        installer: Arc<dyn ToolInstaller>,
        packages: impl IntoIterator<Item = PackageSpec>,
    ) -> Self {
        self.installer = Some(installer);
        self.packages = packages
            .into_iter()
            .map(|spec| (spec.package_name.clone(), spec))
            .collect();
        self
    }

    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Local project roots currently known to the cache.
    pub fn project_roots(&self) -> Arc<Vec<PathBuf>> {
        self.roots.load_full()
    }

    /// Number of resolved entries in the current table.
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.is_set()
    }

    /// The cache can serve lookups: it has entries and is not being rebuilt.
    pub fn is_ready(&self) -> bool {
        !self.is_rebuilding() && !self.is_empty()
    }

    /// Record a new set of project roots and rebuild the table for them.
    ///
    /// Non-local roots are dropped.
    pub async fn set_project_roots(&self, roots: &[String]) -> RebuildOutcome {
        let roots = local_roots(roots);
        log::debug!(
            target: LOG_TARGET,
            "Project roots changed: {:?}",
            roots
        );
        self.roots.store(Arc::new(roots));
        self.rebuild().await
    }

    /// Resolve every managed tool for every root (and the global sentinel)
    /// and replace the table with the results.
    pub async fn rebuild(&self) -> RebuildOutcome {
        let Some(_guard) = self.rebuilding.try_acquire() else {
            log::debug!(target: LOG_TARGET, "Rebuild already in progress, skipping");
            return RebuildOutcome::AlreadyRunning;
        };

        let mut keys: Vec<RootKey> = self
            .roots
            .load()
            .iter()
            .cloned()
            .map(RootKey::Project)
            .collect();
        keys.push(RootKey::Global);

        let mut tasks = JoinSet::new();
        for key in &keys {
            for tool in &self.tools {
                let locator = Arc::clone(&self.locator);
                let tool = tool.clone();
                let key = key.clone();
                tasks.spawn(async move {
                    let options = key
                        .directory()
                        .map(LocatorOptions::for_directory)
                        .unwrap_or_default();
                    let found = locator.find_tool(&tool, &options).await;
                    (tool, key, found)
                });
            }
        }

        let mut table = ToolTable::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tool, key, Some(path))) => {
                    log::trace!(
                        target: LOG_TARGET,
                        "Resolved {} for {} -> {}",
                        tool,
                        key,
                        path.display()
                    );
                    table.insert((tool, key), path);
                }
                Ok((tool, key, None)) => {
                    log::trace!(target: LOG_TARGET, "{} not found for {}", tool, key);
                }
                Err(err) => {
                    log::warn!(
                        target: LOG_TARGET,
                        "Tool resolution batch failed, keeping previous cache: {}",
                        err
                    );
                    return RebuildOutcome::Failed;
                }
            }
        }

        let entries = table.len();
        self.table.store(Arc::new(table));
        log::debug!(
            target: LOG_TARGET,
            "Tool cache rebuilt with {} entries across {} roots",
            entries,
            keys.len()
        );
        RebuildOutcome::Rebuilt { entries }
    }

    /// Project root a document belongs to.
    pub fn root_for(&self, document: Option<&dyn Document>) -> RootKey {
        let path = document.and_then(|d| d.path());
        project_root_for(path.as_deref(), &self.roots.load())
    }

    /// Locator options for a document: its project root as the search directory.
    pub fn locator_options(&self, document: Option<&dyn Document>) -> LocatorOptions {
        self.root_for(document)
            .directory()
            .map(LocatorOptions::for_directory)
            .unwrap_or_default()
    }

    /// Environment for tools run on behalf of `root`, falling back to the
    /// process environment when the locator has none.
    pub fn environment_for(&self, root: &RootKey) -> HashMap<String, String> {
        self.locator
            .environment(root.directory())
            .unwrap_or_else(|| std::env::vars().collect())
    }

    /// Cached path for an exact `(tool, root)` entry.
    pub fn cached_path(&self, tool: &str, root: &RootKey) -> Option<PathBuf> {
        self.table.load().get(&(tool.to_string(), root.clone())).cloned()
    }

    /// Look up a tool for a document without touching the locator.
    ///
    /// Tries the document's project root first, then the global entry.
    pub fn lookup(&self, tool: &str, document: Option<&dyn Document>) -> Option<PathBuf> {
        let root = self.root_for(document);
        let table = self.table.load();

        if matches!(root, RootKey::Project(_))
            && let Some(path) = table.get(&(tool.to_string(), root))
        {
            return Some(path.clone());
        }
        table.get(&(tool.to_string(), RootKey::Global)).cloned()
    }

    /// Cached lookup, falling back to a live locator query on a miss.
    ///
    /// A live hit is returned but not written into the table.
    pub async fn resolve(&self, tool: &str, document: Option<&dyn Document>) -> Option<PathBuf> {
        if let Some(path) = self.lookup(tool, document) {
            return Some(path);
        }
        let options = self.locator_options(document);
        let found = self.locator.find_tool(tool, &options).await;
        if found.is_none() {
            log::debug!(target: LOG_TARGET, "{} could not be resolved", tool);
        }
        found
    }

    /// Forget that the installer was tried for `tool`.
    pub fn reset_install_attempt(&self, tool: &str) {
        self.install_attempted.reset(&tool.to_string());
    }

    pub fn install_attempted(&self, tool: &str) -> bool {
        self.install_attempted.contains(&tool.to_string())
    }

    /// Make sure `tool` can be resolved, installing it at most once per session.
    pub async fn ensure_available(&self, tool: &str) -> EnsureOutcome {
        if self.is_rebuilding() {
            return EnsureOutcome::NotReady;
        }
        if let Some(path) = self.lookup(tool, None) {
            return EnsureOutcome::Available(path);
        }

        let options = self.locator_options(None);
        if let Some(path) = self.locator.find_tool(tool, &options).await {
            log::info!(
                target: LOG_TARGET,
                "{} found at {}, refreshing cache",
                tool,
                path.display()
            );
            self.refresh_after(tool).await;
            return EnsureOutcome::Available(path);
        }

        let Some(installer) = self.installer.as_ref() else {
            return EnsureOutcome::NoInstaller;
        };
        if !self.install_attempted.mark(&tool.to_string()) {
            return EnsureOutcome::AlreadyAttempted;
        }
        let Some(spec) = self.packages.get(tool) else {
            log::info!(
                target: LOG_TARGET,
                "{} is missing and has no installable package",
                tool
            );
            return EnsureOutcome::NotInstallable;
        };

        log::info!(
            target: LOG_TARGET,
            "Installing missing tool {} from {}",
            tool,
            spec.package_path
        );
        match installer.get(spec).await {
            Ok(()) => {
                self.refresh_after(tool).await;
                EnsureOutcome::Installed
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Failed to install {}: {}", tool, err);
                EnsureOutcome::InstallFailed
            }
        }
    }

    /// Rebuild after `tool` appeared. A rebuild already in flight may have
    /// started before the tool existed, so the table can still lack it.
    async fn refresh_after(&self, tool: &str) {
        match self.rebuild().await {
            RebuildOutcome::Rebuilt { .. } => {}
            RebuildOutcome::AlreadyRunning => log::info!(
                target: LOG_TARGET,
                "Cache refresh for {} skipped: a rebuild is already in progress",
                tool
            ),
            RebuildOutcome::Failed => log::warn!(
                target: LOG_TARGET,
                "Cache refresh for {} failed, keeping the previous table",
                tool
            ),
        }
    }

    /// Run [`Self::ensure_available`] on the current tokio runtime without
    /// waiting for it. Returns `false` when no runtime is available.
    pub fn ensure_available_in_background(self: &Arc<Self>, tool: &str) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!(
                target: LOG_TARGET,
                "No async runtime, skipping availability check for {}",
                tool
            );
            return false;
        };
        let cache = Arc::clone(self);
        let tool = tool.to_string();
        handle.spawn(async move {
            let outcome = cache.ensure_available(&tool).await;
            log::debug!(target: LOG_TARGET, "ensure_available({}) -> {:?}", tool, outcome);
        });
        true
    }
}

//! Host-facing coordinator.
//!
//! `Toolwright` receives editor events and commands and routes them to the
//! formatting pipeline, the test runner and the coverage overlay. It owns the
//! live settings and the two tool caches (formatters and test tools).

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Settings, SettingsChange, SettingsManager};
use crate::coverage::CoverageOverlay;
use crate::format::{FormatInvoker, FormatOutcome};
use crate::host::{
    Document, DocumentId, OutputSurface, ProcessExecutor, ToolInstaller, ToolLocator, Workspace,
    is_usable,
};
use crate::testing::{RunOutcome, TestRunner};
use crate::tools::{
    EnsureOutcome, FORMAT_TOOLS, RebuildOutcome, TEST_TOOLS, ToolResolutionCache,
    missing_formatter_spec,
};

/// Something that happened in the editor.
pub enum HostEvent {
    ProjectRootsChanged(Vec<String>),
    SettingsChanged(Settings),
    DocumentOpened(Arc<dyn Document>),
    /// The document is about to be written to `path`.
    DocumentWillSave {
        document: Arc<dyn Document>,
        path: Option<PathBuf>,
    },
    DocumentSaved(Arc<dyn Document>),
    DocumentClosed(DocumentId),
}

impl std::fmt::Debug for HostEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectRootsChanged(roots) => {
                f.debug_tuple("ProjectRootsChanged").field(roots).finish()
            }
            Self::SettingsChanged(settings) => {
                f.debug_tuple("SettingsChanged").field(settings).finish()
            }
            Self::DocumentOpened(document) => {
                f.debug_tuple("DocumentOpened").field(&document.id()).finish()
            }
            Self::DocumentWillSave { document, path } => f
                .debug_struct("DocumentWillSave")
                .field("document", &document.id())
                .field("path", path)
                .finish(),
            Self::DocumentSaved(document) => {
                f.debug_tuple("DocumentSaved").field(&document.id()).finish()
            }
            Self::DocumentClosed(id) => f.debug_tuple("DocumentClosed").field(id).finish(),
        }
    }
}

/// A command invoked by the user on the active document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Format with the named tool.
    Format(String),
    RunTests,
    HideCoverage,
}

/// What handling an event or command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Nothing to do for this event (feature disabled or no usable document).
    Ignored,
    RootsChanged {
        format: RebuildOutcome,
        test: RebuildOutcome,
    },
    SettingsApplied(SettingsChange),
    CoverageApplied,
    CoverageHidden,
    Formatted(FormatOutcome),
    Tested(RunOutcome),
    DocumentForgotten,
}

/// Collaborators supplied by the host.
pub struct Collaborators {
    pub locator: Arc<dyn ToolLocator>,
    pub executor: Arc<dyn ProcessExecutor>,
    pub installer: Option<Arc<dyn ToolInstaller>>,
    pub workspace: Arc<dyn Workspace>,
    pub output: Arc<dyn OutputSurface>,
}

/// The coordinator the host talks to.
pub struct Toolwright {
    settings: SettingsManager,
    workspace: Arc<dyn Workspace>,
    overlay: Arc<CoverageOverlay>,
    formatter: FormatInvoker,
    runner: TestRunner,
}

impl std::fmt::Debug for Toolwright {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolwright")
            .field("settings", &self.settings)
            .field("overlay", &self.overlay)
            .field("formatter", &self.formatter)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

impl Toolwright {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        let Collaborators {
            locator,
            executor,
            installer,
            workspace,
            output,
        } = collaborators;

        let mut format_cache = ToolResolutionCache::new(FORMAT_TOOLS, Arc::clone(&locator));
        if let Some(installer) = installer {
            format_cache = format_cache.with_installer(
                installer,
                FORMAT_TOOLS.iter().filter_map(|tool| missing_formatter_spec(tool)),
            );
        }
        let test_cache = ToolResolutionCache::new(TEST_TOOLS, locator);

        let overlay = Arc::new(CoverageOverlay::new());
        let formatter = FormatInvoker::new(Arc::new(format_cache), Arc::clone(&executor));
        let runner = TestRunner::new(
            Arc::new(test_cache),
            executor,
            Arc::clone(&overlay),
            Arc::clone(&workspace),
            output,
        );

        Self {
            settings: SettingsManager::new(settings),
            workspace,
            overlay,
            formatter,
            runner,
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load()
    }

    pub fn overlay(&self) -> &Arc<CoverageOverlay> {
        &self.overlay
    }

    pub fn format_cache(&self) -> &Arc<ToolResolutionCache> {
        self.formatter.cache()
    }

    pub fn test_cache(&self) -> &Arc<ToolResolutionCache> {
        self.runner.cache()
    }

    pub fn runner(&self) -> &TestRunner {
        &self.runner
    }

    /// Resolve tools for the workspace's current roots and make sure the
    /// configured formatter is available.
    pub async fn start(&self) -> HandleOutcome {
        let outcome = self.set_project_roots(self.workspace.project_roots()).await;
        let tool = self.settings.load().format.tool.clone();
        let availability = self.format_cache().ensure_available(&tool).await;
        log_availability(&tool, &availability);
        outcome
    }

    /// Remove the coverage directory and every overlay.
    pub fn shutdown(&self) {
        self.overlay.teardown(&self.workspace.open_documents());
    }

    pub async fn handle_event(&self, event: HostEvent) -> HandleOutcome {
        log::trace!("Host event: {:?}", event);
        match event {
            HostEvent::ProjectRootsChanged(roots) => self.set_project_roots(roots).await,
            HostEvent::SettingsChanged(settings) => self.apply_settings(settings).await,
            HostEvent::DocumentOpened(document) => {
                let mode = self.settings.load().test.coverage_highlight_mode;
                self.overlay.apply_to_document(document.as_ref(), mode);
                HandleOutcome::CoverageApplied
            }
            HostEvent::DocumentWillSave { document, path } => {
                match self.will_save(document.as_ref(), path) {
                    Some(outcome) => HandleOutcome::Formatted(outcome),
                    None => HandleOutcome::Ignored,
                }
            }
            HostEvent::DocumentSaved(document) => {
                let settings = self.settings.load();
                if !settings.test.run_tests_on_save {
                    return HandleOutcome::Ignored;
                }
                HandleOutcome::Tested(self.runner.run(document.as_ref(), settings.test).await)
            }
            HostEvent::DocumentClosed(id) => {
                self.overlay.forget_document(id);
                HandleOutcome::DocumentForgotten
            }
        }
    }

    /// Format a document that is about to be saved, when format-on-save is on.
    ///
    /// Synchronous: the buffer must be formatted before the save proceeds.
    pub fn will_save(&self, document: &dyn Document, path: Option<PathBuf>) -> Option<FormatOutcome> {
        let settings = self.settings.load();
        if !settings.format.format_on_save {
            return None;
        }
        Some(
            self.formatter
                .format(document, &settings.format.tool, path.as_deref()),
        )
    }

    pub async fn handle_command(&self, command: HostCommand) -> HandleOutcome {
        let Some(document) = self
            .workspace
            .active_document()
            .filter(|document| is_usable(document.as_ref()))
        else {
            log::debug!("No usable active document for {:?}", command);
            return HandleOutcome::Ignored;
        };

        match command {
            HostCommand::Format(tool) => {
                HandleOutcome::Formatted(self.formatter.format(document.as_ref(), &tool, None))
            }
            HostCommand::RunTests => {
                let settings = self.settings.load();
                HandleOutcome::Tested(self.runner.run(document.as_ref(), settings.test).await)
            }
            HostCommand::HideCoverage => {
                // Stored ranges stay so coverage can be shown again.
                self.overlay.clear(&self.workspace.open_documents());
                HandleOutcome::CoverageHidden
            }
        }
    }

    async fn set_project_roots(&self, roots: Vec<String>) -> HandleOutcome {
        let (format, test) = tokio::join!(
            self.format_cache().set_project_roots(&roots),
            self.test_cache().set_project_roots(&roots),
        );
        HandleOutcome::RootsChanged { format, test }
    }

    async fn apply_settings(&self, settings: Settings) -> HandleOutcome {
        let change = self.settings.apply(settings);
        let current = self.settings.load();

        if let Some(tool) = &change.format_tool {
            self.format_cache().reset_install_attempt(tool);
            let availability = self.format_cache().ensure_available(tool).await;
            log_availability(tool, &availability);
        }
        if change.highlight_mode_changed {
            self.overlay.apply_stored(
                &self.workspace.open_documents(),
                current.test.coverage_highlight_mode,
            );
        }
        HandleOutcome::SettingsApplied(change)
    }
}

fn log_availability(tool: &str, outcome: &EnsureOutcome) {
    match outcome {
        EnsureOutcome::Available(_) | EnsureOutcome::Installed => {
            log::debug!(target: "toolwright::cache", "{} is available", tool)
        }
        EnsureOutcome::InstallFailed | EnsureOutcome::NotInstallable => {
            log::warn!(target: "toolwright::cache", "{} is not available ({:?})", tool, outcome)
        }
        _ => log::debug!(target: "toolwright::cache", "{}: {:?}", tool, outcome),
    }
}

//! Test runs with coverage instrumentation.
//!
//! ```text
//!  run(doc) ──► Resolving ──► Running ──► Reporting ──► Idle
//!                   │             │
//!                   │             └─ executor error ──► Idle (Errored)
//!                   └─ go / cover missing ──► Idle (ToolMissing)
//! ```
//!
//! Only one run is in flight at a time. A `run` while another is active
//! returns [`RunOutcome::AlreadyRunning`] without touching anything.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::TestSettings;
use crate::coverage::CoverageOverlay;
use crate::error::LockResultExt;
use crate::guard::FlightFlag;
use crate::host::{
    Document, ExecOptions, OutputSurface, ProcessExecutor, TestReport, TestState, Workspace,
    is_usable,
};
use crate::tools::{COVER, GO, ToolResolutionCache};

const LOG_TARGET: &str = "toolwright::test";

/// Where a test run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    #[default]
    Idle,
    Resolving,
    Running,
    Reporting,
}

/// Result of a [`TestRunner::run`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The document is closed, has no buffer or has never been saved.
    InvalidDocument,
    /// Another run is in flight.
    AlreadyRunning,
    /// The named tool could not be resolved.
    ToolMissing(String),
    Passed,
    Failed { exit_code: i32 },
    /// The test process could not be run.
    Errored,
}

/// Runs package tests for a document and feeds the coverage report to the overlay.
pub struct TestRunner {
    cache: Arc<ToolResolutionCache>,
    executor: Arc<dyn ProcessExecutor>,
    overlay: Arc<CoverageOverlay>,
    workspace: Arc<dyn Workspace>,
    output: Arc<dyn OutputSurface>,
    running: FlightFlag,
    phase: Mutex<RunPhase>,
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("cache", &self.cache)
            .field("running", &self.running)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Returns the phase to `Idle` when a run ends, however it ends.
struct PhaseReset<'a>(&'a Mutex<RunPhase>);

impl Drop for PhaseReset<'_> {
    fn drop(&mut self) {
        *self.0.lock().recover_poison("TestRunner::phase_reset") = RunPhase::Idle;
    }
}

impl TestRunner {
    pub fn new(
        cache: Arc<ToolResolutionCache>,
        executor: Arc<dyn ProcessExecutor>,
        overlay: Arc<CoverageOverlay>,
        workspace: Arc<dyn Workspace>,
        output: Arc<dyn OutputSurface>,
    ) -> Self {
        Self {
            cache,
            executor,
            overlay,
            workspace,
            output,
            running: FlightFlag::new(),
            phase: Mutex::new(RunPhase::Idle),
        }
    }

    pub fn cache(&self) -> &Arc<ToolResolutionCache> {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().recover_poison("TestRunner::phase")
    }

    fn enter(&self, phase: RunPhase) {
        log::trace!(target: LOG_TARGET, "Test run phase: {:?}", phase);
        *self.phase.lock().recover_poison("TestRunner::enter") = phase;
    }

    /// Run the tests of the package `document` belongs to.
    pub async fn run(&self, document: &dyn Document, settings: TestSettings) -> RunOutcome {
        let Some(path) = document.path().filter(|_| is_usable(document)) else {
            return RunOutcome::InvalidDocument;
        };
        let Some(_running) = self.running.try_acquire() else {
            log::debug!(target: LOG_TARGET, "Test run already in progress, skipping");
            return RunOutcome::AlreadyRunning;
        };
        let _reset = PhaseReset(&self.phase);

        self.enter(RunPhase::Resolving);
        self.overlay.clear(&self.workspace.open_documents());
        self.overlay.store_ranges(Vec::new());
        let report_path = match self.overlay.prepare_report_path() {
            Ok(report_path) => Some(report_path),
            Err(err) => {
                log::warn!(
                    target: LOG_TARGET,
                    "Running tests without coverage: {}",
                    err
                );
                None
            }
        };

        let Some(go) = self.cache.resolve(GO, Some(document)).await else {
            log::warn!(target: LOG_TARGET, "Cannot run tests: {} not found", GO);
            return RunOutcome::ToolMissing(GO.to_string());
        };
        if self.cache.resolve(COVER, Some(document)).await.is_none() {
            log::warn!(target: LOG_TARGET, "Cannot run tests: {} not found", COVER);
            return RunOutcome::ToolMissing(COVER.to_string());
        }

        self.enter(RunPhase::Running);
        let args = test_args(report_path.as_deref(), settings);
        self.output.update(TestReport {
            state: TestState::Pending,
            exit_code: 0,
            output: format!("Running {} {}", GO, args.join(" ")),
        });

        let root = self.cache.root_for(Some(document));
        let options = ExecOptions {
            cwd: path.parent().map(Path::to_path_buf),
            env: self.cache.environment_for(&root),
            input: None,
        };
        let result = match self.executor.exec(&go, &args, options).await {
            Ok(result) => result,
            Err(err) => {
                log::error!(target: LOG_TARGET, "Failed to run tests: {}", err);
                self.output.update(TestReport {
                    state: TestState::Fail,
                    exit_code: -1,
                    output: err.to_string(),
                });
                return RunOutcome::Errored;
            }
        };

        self.enter(RunPhase::Reporting);
        let output = combine_output(&result.stdout, &result.stderr);
        if result.exit_code != 0 {
            log::info!(
                target: LOG_TARGET,
                "Tests failed for {} with exit code {}",
                path.display(),
                result.exit_code
            );
            self.output.update(TestReport {
                state: TestState::Fail,
                exit_code: result.exit_code,
                output,
            });
            return RunOutcome::Failed {
                exit_code: result.exit_code,
            };
        }

        if let Some(report_path) = report_path {
            self.overlay.load_report(&report_path);
            self.overlay.apply_stored(
                &self.workspace.open_documents(),
                settings.coverage_highlight_mode,
            );
        }
        self.output.update(TestReport {
            state: TestState::Success,
            exit_code: 0,
            output,
        });
        RunOutcome::Passed
    }
}

/// Arguments for `go test`.
pub fn test_args(report_path: Option<&Path>, settings: TestSettings) -> Vec<String> {
    let mut args = vec!["test".to_string()];
    if let Some(report_path) = report_path {
        args.push(format!("-coverprofile={}", report_path.display()));
    }
    if settings.short_flag {
        args.push("-short".to_string());
    }
    if settings.verbose_flag {
        args.push("-v".to_string());
    }
    args
}

/// Stderr first, then stdout, trimmed.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    let combined = if stderr.trim().is_empty() {
        stdout.to_string()
    } else {
        format!("{}\n{}", stderr, stdout)
    };
    combined.trim().to_string()
}

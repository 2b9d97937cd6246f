//! Buffer formatting through external formatter tools.
//!
//! Formatting is synchronous: it runs while the host is about to save a
//! buffer, so the formatted text must be in place before the save
//! completes. The buffer is only touched when the tool succeeds cleanly.

pub mod diff;

pub use diff::{apply_edits, compute_edits};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::host::{Document, ExecOptions, ProcessExecutor, is_usable};
use crate::tools::{GOIMPORTS, ToolResolutionCache};

const LOG_TARGET: &str = "toolwright::format";

/// Result of a [`FormatInvoker::format`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// The document is closed or has no buffer.
    InvalidDocument,
    /// The tool is not cached yet; an availability check was scheduled.
    ToolUnavailable,
    /// The tool could not be run at all.
    ProcessFailed(String),
    /// The tool wrote to stderr; the document was left untouched.
    ToolError(String),
    /// The tool exited unsuccessfully without an error message.
    Failed { exit_code: i32 },
    /// The tool's output equals the current text.
    Unchanged,
    /// The document was updated with this many edits.
    Applied { edits: usize },
}

/// Formats documents by piping their text through a formatter tool.
pub struct FormatInvoker {
    cache: Arc<ToolResolutionCache>,
    executor: Arc<dyn ProcessExecutor>,
}

impl std::fmt::Debug for FormatInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatInvoker")
            .field("cache", &self.cache)
            .field("executor", &"dyn ProcessExecutor")
            .finish()
    }
}

impl FormatInvoker {
    pub fn new(cache: Arc<ToolResolutionCache>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { cache, executor }
    }

    pub fn cache(&self) -> &Arc<ToolResolutionCache> {
        &self.cache
    }

    /// Format `document` with `tool`.
    ///
    /// `file_path` is where the buffer is being saved to; it defaults to the
    /// document's own path.
    pub fn format(&self, document: &dyn Document, tool: &str, file_path: Option<&Path>) -> FormatOutcome {
        if !is_usable(document) {
            return FormatOutcome::InvalidDocument;
        }
        let file_path = file_path.map(Path::to_path_buf).or_else(|| document.path());

        let Some(program) = self.cache.lookup(tool, Some(document)) else {
            log::debug!(
                target: LOG_TARGET,
                "{} is not resolved yet, checking availability",
                tool
            );
            self.cache.ensure_available_in_background(tool);
            return FormatOutcome::ToolUnavailable;
        };

        let root = self.cache.root_for(Some(document));
        let original = document.text();
        let options = ExecOptions {
            cwd: root.directory().map(Path::to_path_buf),
            env: self.cache.environment_for(&root),
            input: Some(original.clone()),
        };
        let args = format_args(tool, file_path.as_deref());

        let output = match self.executor.exec_sync(&program, &args, options) {
            Ok(output) => output,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "{}: {}", tool, err);
                return FormatOutcome::ProcessFailed(err.to_string());
            }
        };

        if output.has_stderr() {
            log::warn!(target: LOG_TARGET, "{}: (stderr) {}", tool, output.stderr.trim());
            return FormatOutcome::ToolError(output.stderr);
        }
        if output.exit_code != 0 {
            log::warn!(
                target: LOG_TARGET,
                "{} exited with code {}",
                tool,
                output.exit_code
            );
            return FormatOutcome::Failed {
                exit_code: output.exit_code,
            };
        }

        let edits = compute_edits(&original, &output.stdout);
        if edits.is_empty() {
            return FormatOutcome::Unchanged;
        }
        document.apply_edits(&edits);
        log::debug!(
            target: LOG_TARGET,
            "Applied {} edits from {} to {}",
            edits.len(),
            tool,
            document.id()
        );
        FormatOutcome::Applied { edits: edits.len() }
    }
}

/// Command-line arguments for a formatter run.
///
/// `-e` reports all errors with positions. The import organizer also gets
/// the file's directory so it can resolve sibling packages.
pub fn format_args(tool: &str, file_path: Option<&Path>) -> Vec<String> {
    let mut args = vec!["-e".to_string()];
    if tool == GOIMPORTS
        && let Some(path) = file_path
    {
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        args.push("--srcdir".to_string());
        args.push(dir.to_string_lossy().into_owned());
    }
    args
}

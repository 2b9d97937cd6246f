//! Narrow interfaces to the editing environment and the outside world.
//!
//! Everything toolwright needs from the host editor (documents, workspace,
//! output surface) and from the system (tool lookup, process execution,
//! tool installation) is expressed as a trait here. Production
//! implementations of the system traits live in [`crate::system`]; tests
//! supply in-memory fakes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolResult;

/// Opaque identity of an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Opaque identity of a marker layer owned by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Zero-based line/column position. Columns count UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Half-open range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Replacement of `range` (in the pre-edit text) by `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// How a marker layer is rendered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// CSS-like class distinguishing the layer (`covered` / `uncovered`).
    pub class: String,
    /// Skip rendering empty markers.
    pub only_non_empty: bool,
}

impl Decoration {
    pub fn highlight(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            only_non_empty: true,
        }
    }
}

/// An open document in the editor.
///
/// Implementations must tolerate calls after the document has been closed;
/// callers check [`Document::is_valid`] before mutating.
pub trait Document: Send + Sync {
    fn id(&self) -> DocumentId;

    /// On-disk path, if the document has been saved at least once.
    fn path(&self) -> Option<PathBuf>;

    /// False once the document has been destroyed.
    fn is_valid(&self) -> bool;

    /// Whether the document is backed by a text buffer.
    fn has_buffer(&self) -> bool {
        true
    }

    fn text(&self) -> String;

    /// Apply edits expressed against the current text. Edits never overlap.
    fn apply_edits(&self, edits: &[TextEdit]);

    /// Create a new, empty marker layer.
    fn add_marker_layer(&self) -> Option<LayerId>;

    /// Add a range to an existing layer.
    fn mark_range(&self, layer: LayerId, range: Range);

    /// Attach a visual decoration to a layer.
    fn decorate_layer(&self, layer: LayerId, decoration: &Decoration);

    /// Destroy a layer and everything it marks. Unknown ids are ignored.
    fn destroy_marker_layer(&self, layer: LayerId);
}

/// The editing session: its project roots and documents.
pub trait Workspace: Send + Sync {
    /// Top-level directories, possibly including non-local (`scheme://`) entries.
    fn project_roots(&self) -> Vec<String>;

    fn open_documents(&self) -> Vec<Arc<dyn Document>>;

    fn active_document(&self) -> Option<Arc<dyn Document>>;
}

/// Options passed to [`ToolLocator::find_tool`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    pub directory: Option<PathBuf>,
    pub env: Option<HashMap<String, String>>,
}

impl LocatorOptions {
    pub fn for_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            env: None,
        }
    }
}

/// Resolves tool names to executable paths.
#[async_trait]
pub trait ToolLocator: Send + Sync {
    async fn find_tool(&self, name: &str, options: &LocatorOptions) -> Option<PathBuf>;

    /// Environment tools should run with for the given project directory.
    /// `None` means "use the process environment".
    fn environment(&self, _directory: Option<&Path>) -> Option<HashMap<String, String>> {
        None
    }
}

/// Options for a single process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub input: Option<String>,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// Whether stderr carries anything besides whitespace.
    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Runs external binaries.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn exec(&self, program: &Path, args: &[String], options: ExecOptions)
    -> ToolResult<ExecOutput>;

    fn exec_sync(&self, program: &Path, args: &[String], options: ExecOptions)
    -> ToolResult<ExecOutput>;
}

/// Why a package is being installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    Missing,
    Outdated,
}

/// Identity of an installable tool package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub package_name: String,
    pub package_path: String,
    pub kind: InstallKind,
}

/// Fetches and builds missing tools.
#[async_trait]
pub trait ToolInstaller: Send + Sync {
    async fn get(&self, spec: &PackageSpec) -> ToolResult<()>;
}

/// State of a test run as shown on the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Pending,
    Success,
    Fail,
}

/// A single update for the test output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub state: TestState,
    pub exit_code: i32,
    pub output: String,
}

/// Where test progress and results are shown.
pub trait OutputSurface: Send + Sync {
    fn update(&self, report: TestReport);
}

/// Whether `document` can be formatted or tested at all.
pub fn is_usable(document: &dyn Document) -> bool {
    document.is_valid() && document.has_buffer()
}

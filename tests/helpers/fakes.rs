//! In-memory stand-ins for the host and system collaborators.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use toolwright::error::{ToolError, ToolResult};
use toolwright::format::apply_edits;
use toolwright::host::{
    Decoration, Document, DocumentId, ExecOptions, ExecOutput, LayerId, LocatorOptions,
    OutputSurface, PackageSpec, ProcessExecutor, Range, TestReport, TextEdit, ToolInstaller,
    ToolLocator, Workspace,
};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Marker layer as recorded by [`FakeDocument`].
#[derive(Debug, Clone, Default)]
pub struct RecordedLayer {
    pub ranges: Vec<Range>,
    pub class: Option<String>,
}

pub struct FakeDocument {
    id: DocumentId,
    path: Option<PathBuf>,
    has_buffer: bool,
    valid: AtomicBool,
    text: Mutex<String>,
    layers: Mutex<BTreeMap<u64, RecordedLayer>>,
    next_layer: AtomicU64,
    edit_calls: AtomicUsize,
}

impl FakeDocument {
    pub fn new(id: u64, path: &str, text: &str) -> Self {
        Self {
            id: DocumentId(id),
            path: Some(PathBuf::from(path)),
            has_buffer: true,
            valid: AtomicBool::new(true),
            text: Mutex::new(text.to_string()),
            layers: Mutex::new(BTreeMap::new()),
            next_layer: AtomicU64::new(1),
            edit_calls: AtomicUsize::new(0),
        }
    }

    pub fn unsaved(id: u64, text: &str) -> Self {
        Self {
            path: None,
            ..Self::new(id, "/unused", text)
        }
    }

    pub fn without_buffer(id: u64, path: &str) -> Self {
        Self {
            has_buffer: false,
            ..Self::new(id, path, "")
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn close(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn edit_calls(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.lock().unwrap().len()
    }

    /// Ranges of every live layer with the given class.
    pub fn ranges_with_class(&self, class: &str) -> Vec<Range> {
        self.layers
            .lock()
            .unwrap()
            .values()
            .filter(|layer| layer.class.as_deref() == Some(class))
            .flat_map(|layer| layer.ranges.clone())
            .collect()
    }

    pub fn layers_with_class(&self, class: &str) -> usize {
        self.layers
            .lock()
            .unwrap()
            .values()
            .filter(|layer| layer.class.as_deref() == Some(class))
            .count()
    }
}

impl Document for FakeDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn has_buffer(&self) -> bool {
        self.has_buffer
    }

    fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn apply_edits(&self, edits: &[TextEdit]) {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        let mut text = self.text.lock().unwrap();
        *text = apply_edits(&text, edits);
    }

    fn add_marker_layer(&self) -> Option<LayerId> {
        let id = self.next_layer.fetch_add(1, Ordering::SeqCst);
        self.layers
            .lock()
            .unwrap()
            .insert(id, RecordedLayer::default());
        Some(LayerId(id))
    }

    fn mark_range(&self, layer: LayerId, range: Range) {
        if let Some(layer) = self.layers.lock().unwrap().get_mut(&layer.0) {
            layer.ranges.push(range);
        }
    }

    fn decorate_layer(&self, layer: LayerId, decoration: &Decoration) {
        if let Some(layer) = self.layers.lock().unwrap().get_mut(&layer.0) {
            layer.class = Some(decoration.class.clone());
        }
    }

    fn destroy_marker_layer(&self, layer: LayerId) {
        self.layers.lock().unwrap().remove(&layer.0);
    }
}

// ---------------------------------------------------------------------------
// Workspace and output
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeWorkspace {
    roots: Mutex<Vec<String>>,
    documents: Mutex<Vec<Arc<dyn Document>>>,
    active: Mutex<Option<Arc<dyn Document>>>,
}

impl FakeWorkspace {
    pub fn new(roots: &[&str]) -> Self {
        Self {
            roots: Mutex::new(roots.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn open(&self, document: Arc<dyn Document>) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn activate(&self, document: Arc<dyn Document>) {
        *self.active.lock().unwrap() = Some(document);
    }

    pub fn close(&self, id: DocumentId) {
        self.documents.lock().unwrap().retain(|d| d.id() != id);
    }
}

impl Workspace for FakeWorkspace {
    fn project_roots(&self) -> Vec<String> {
        self.roots.lock().unwrap().clone()
    }

    fn open_documents(&self) -> Vec<Arc<dyn Document>> {
        self.documents.lock().unwrap().clone()
    }

    fn active_document(&self) -> Option<Arc<dyn Document>> {
        self.active.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingOutput {
    reports: Mutex<Vec<TestReport>>,
}

impl RecordingOutput {
    pub fn reports(&self) -> Vec<TestReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl OutputSurface for RecordingOutput {
    fn update(&self, report: TestReport) {
        self.reports.lock().unwrap().push(report);
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Resolves tools from a name → path table, independent of the directory.
///
/// With a gate installed, every query announces itself on `entered` and then
/// waits until the gate is opened.
#[derive(Default)]
pub struct FakeLocator {
    tools: Mutex<HashMap<String, PathBuf>>,
    calls: AtomicUsize,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    env: Mutex<Option<HashMap<String, String>>>,
    panics: Mutex<HashSet<String>>,
}

impl FakeLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tool: &str, path: impl Into<PathBuf>) {
        self.tools
            .lock()
            .unwrap()
            .insert(tool.to_string(), path.into());
    }

    pub fn remove(&self, tool: &str) {
        self.tools.lock().unwrap().remove(tool);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_environment(&self, env: HashMap<String, String>) {
        *self.env.lock().unwrap() = Some(env);
    }

    /// Hold every query until the returned `open` is notified. `entered`
    /// fires once per query that reached the gate.
    pub fn install_gate(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let open = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&open)));
        (entered, open)
    }

    pub fn remove_gate(&self) {
        *self.gate.lock().unwrap() = None;
    }

    /// Make every query for `tool` panic, as a broken locator task would.
    pub fn panic_on(&self, tool: &str) {
        self.panics.lock().unwrap().insert(tool.to_string());
    }

    pub fn stop_panicking(&self) {
        self.panics.lock().unwrap().clear();
    }
}

#[async_trait]
impl ToolLocator for FakeLocator {
    async fn find_tool(&self, name: &str, _options: &LocatorOptions) -> Option<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some((entered, open)) = gate {
            entered.notify_one();
            open.notified().await;
        }
        let panics = self.panics.lock().unwrap().contains(name);
        if panics {
            panic!("locator failed while resolving {}", name);
        }
        self.tools.lock().unwrap().get(name).cloned()
    }

    fn environment(&self, _directory: Option<&Path>) -> Option<HashMap<String, String>> {
        self.env.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// A recorded process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub options: ExecOptions,
}

/// Returns a canned output and counts invocations.
///
/// When a coverage report is configured, it is written to the path given by
/// a `-coverprofile=` argument, like `go test` would.
pub struct CountingExecutor {
    output: Mutex<ExecOutput>,
    fail_with: Mutex<Option<String>>,
    report: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    invocations: Mutex<Vec<Invocation>>,
    calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn new(output: ExecOutput) -> Self {
        Self {
            output: Mutex::new(output),
            fail_with: Mutex::new(None),
            report: Mutex::new(None),
            delay: Mutex::new(None),
            invocations: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_output(&self, output: ExecOutput) {
        *self.output.lock().unwrap() = output;
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn write_report(&self, report: &str) {
        *self.report.lock().unwrap() = Some(report.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Invocation> {
        self.invocations.lock().unwrap().last().cloned()
    }

    fn record(&self, program: &Path, args: &[String], options: ExecOptions) -> ToolResult<ExecOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            options,
        });

        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ToolError::process(program.display().to_string(), message));
        }
        if let Some(report) = self.report.lock().unwrap().clone()
            && let Some(path) = args.iter().find_map(|a| a.strip_prefix("-coverprofile="))
        {
            std::fs::write(path, report)?;
        }
        Ok(self.output.lock().unwrap().clone())
    }
}

#[async_trait]
impl ProcessExecutor for CountingExecutor {
    async fn exec(&self, program: &Path, args: &[String], options: ExecOptions) -> ToolResult<ExecOutput> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(program, args, options)
    }

    fn exec_sync(&self, program: &Path, args: &[String], options: ExecOptions) -> ToolResult<ExecOutput> {
        self.record(program, args, options)
    }
}

// ---------------------------------------------------------------------------
// Installer
// ---------------------------------------------------------------------------

/// Records install requests; on success the tool becomes visible to the locator.
pub struct FakeInstaller {
    locator: Arc<FakeLocator>,
    succeed: AtomicBool,
    requests: Mutex<Vec<PackageSpec>>,
}

impl FakeInstaller {
    pub fn succeeding(locator: Arc<FakeLocator>) -> Self {
        Self {
            locator,
            succeed: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(locator: Arc<FakeLocator>) -> Self {
        let installer = Self::succeeding(locator);
        installer.succeed.store(false, Ordering::SeqCst);
        installer
    }

    pub fn requests(&self) -> Vec<PackageSpec> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolInstaller for FakeInstaller {
    async fn get(&self, spec: &PackageSpec) -> ToolResult<()> {
        self.requests.lock().unwrap().push(spec.clone());
        if !self.succeed.load(Ordering::SeqCst) {
            return Err(ToolError::install_failure(&spec.package_name, "network down"));
        }
        self.locator.set(
            &spec.package_name,
            PathBuf::from("/installed/bin").join(&spec.package_name),
        );
        Ok(())
    }
}

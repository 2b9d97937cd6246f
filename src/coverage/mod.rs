//! Coverage overlays on open documents.
//!
//! `CoverageOverlay` owns three things:
//! - the ranges parsed from the latest successful coverage report,
//! - the marker layers it created on each document (`MarkerPair`),
//! - the temporary directory the test runner writes the report into.
//!
//! Marker layers are always torn down before new ones are created for a
//! document, so a document never carries more than one covered and one
//! uncovered layer.

pub mod parser;

pub use parser::{CoverageRange, parse, parse_report};

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::CoverageHighlightMode;
use crate::error::{LockResultExt, ToolError, ToolResult};
use crate::host::{Decoration, Document, DocumentId, LayerId};

const LOG_TARGET: &str = "toolwright::coverage";

/// File name of the report inside the temporary directory.
pub const REPORT_FILE_NAME: &str = "coverage.out";

/// Highlight class for covered ranges.
pub const COVERED_CLASS: &str = "covered";
/// Highlight class for uncovered ranges.
pub const UNCOVERED_CLASS: &str = "uncovered";

/// Marker layers owned by one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerPair {
    pub covered: Option<LayerId>,
    pub uncovered: Option<LayerId>,
}

impl MarkerPair {
    fn layers(&self) -> impl Iterator<Item = LayerId> {
        self.covered.into_iter().chain(self.uncovered)
    }
}

/// Projects coverage ranges onto documents and owns the report directory.
#[derive(Default)]
pub struct CoverageOverlay {
    ranges: Mutex<Arc<Vec<CoverageRange>>>,
    marked: DashMap<DocumentId, MarkerPair>,
    temp_dir: Mutex<Option<TempDir>>,
}

impl std::fmt::Debug for CoverageOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageOverlay")
            .field("ranges", &self.ranges().len())
            .field("marked_documents", &self.marked.len())
            .field("temp_dir", &self.temp_dir_path())
            .finish()
    }
}

impl CoverageOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranges from the most recent successful report.
    pub fn ranges(&self) -> Arc<Vec<CoverageRange>> {
        Arc::clone(&self.ranges.lock().recover_poison("CoverageOverlay::ranges"))
    }

    /// Replace the stored ranges.
    pub fn store_ranges(&self, ranges: Vec<CoverageRange>) {
        *self.ranges.lock().recover_poison("CoverageOverlay::store_ranges") = Arc::new(ranges);
    }

    /// Parse the report at `report_path` and keep its ranges.
    pub fn load_report(&self, report_path: &std::path::Path) -> usize {
        let ranges = parse(report_path);
        let count = ranges.len();
        log::debug!(
            target: LOG_TARGET,
            "Loaded {} coverage ranges from {}",
            count,
            report_path.display()
        );
        self.store_ranges(ranges);
        count
    }

    /// Marker state currently tracked for a document.
    pub fn markers_for(&self, id: DocumentId) -> Option<MarkerPair> {
        self.marked.get(&id).map(|entry| *entry)
    }

    /// Number of documents carrying coverage layers.
    pub fn marked_documents(&self) -> usize {
        self.marked.len()
    }

    /// Project `ranges` onto every document they belong to.
    pub fn apply(
        &self,
        ranges: &[CoverageRange],
        documents: &[Arc<dyn Document>],
        mode: CoverageHighlightMode,
    ) {
        for document in documents {
            self.apply_ranges(document.as_ref(), ranges, mode);
        }
    }

    /// Project the stored ranges onto every document.
    pub fn apply_stored(&self, documents: &[Arc<dyn Document>], mode: CoverageHighlightMode) {
        let ranges = self.ranges();
        self.apply(&ranges, documents, mode);
    }

    /// Project the stored ranges onto a single (newly opened) document.
    pub fn apply_to_document(&self, document: &dyn Document, mode: CoverageHighlightMode) {
        let ranges = self.ranges();
        self.apply_ranges(document, &ranges, mode);
    }

    fn apply_ranges(
        &self,
        document: &dyn Document,
        ranges: &[CoverageRange],
        mode: CoverageHighlightMode,
    ) {
        if !document.is_valid() {
            return;
        }
        let Some(path) = document.path() else {
            return;
        };

        self.clear_document(document);
        if mode == CoverageHighlightMode::Disabled {
            return;
        }

        let mut covered = Vec::new();
        let mut uncovered = Vec::new();
        for range in ranges.iter().filter(|r| r.matches(&path)) {
            if range.is_covered() {
                if mode.shows_covered() {
                    covered.push(range.range());
                }
            } else if mode.shows_uncovered() {
                uncovered.push(range.range());
            }
        }

        let pair = MarkerPair {
            covered: Self::create_layer(document, &covered, COVERED_CLASS),
            uncovered: Self::create_layer(document, &uncovered, UNCOVERED_CLASS),
        };
        if pair.covered.is_some() || pair.uncovered.is_some() {
            log::trace!(
                target: LOG_TARGET,
                "Marked {} covered / {} uncovered ranges on {}",
                covered.len(),
                uncovered.len(),
                path.display()
            );
            self.marked.insert(document.id(), pair);
        }
    }

    fn create_layer(
        document: &dyn Document,
        ranges: &[crate::host::Range],
        class: &str,
    ) -> Option<LayerId> {
        if ranges.is_empty() {
            return None;
        }
        let layer = document.add_marker_layer()?;
        for range in ranges {
            document.mark_range(layer, *range);
        }
        document.decorate_layer(layer, &Decoration::highlight(class));
        Some(layer)
    }

    /// Destroy the layers tracked for one document.
    pub fn clear_document(&self, document: &dyn Document) {
        if let Some((_, pair)) = self.marked.remove(&document.id()) {
            for layer in pair.layers() {
                document.destroy_marker_layer(layer);
            }
        }
    }

    /// Destroy every tracked layer and forget all marker state.
    pub fn clear(&self, documents: &[Arc<dyn Document>]) {
        for document in documents {
            self.clear_document(document.as_ref());
        }
        // Layers on documents that are no longer open died with them.
        self.marked.clear();
    }

    /// Drop marker state for a document that has been closed.
    pub fn forget_document(&self, id: DocumentId) {
        self.marked.remove(&id);
    }

    /// Path of the live temporary directory, if any.
    pub fn temp_dir_path(&self) -> Option<PathBuf> {
        self.temp_dir
            .lock()
            .recover_poison("CoverageOverlay::temp_dir_path")
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
    }

    /// Replace the temporary directory with a fresh one and return the
    /// report path inside it.
    pub fn prepare_report_path(&self) -> ToolResult<PathBuf> {
        let mut slot = self
            .temp_dir
            .lock()
            .recover_poison("CoverageOverlay::prepare_report_path");
        if let Some(previous) = slot.take() {
            Self::remove_dir(previous);
        }

        let dir = tempfile::Builder::new()
            .prefix("toolwright-cover-")
            .tempdir()
            .map_err(|err| ToolError::filesystem(std::env::temp_dir(), err))?;
        let canonical = dir
            .path()
            .canonicalize()
            .map_err(|err| ToolError::filesystem(dir.path(), err))?;
        *slot = Some(dir);

        Ok(canonical.join(REPORT_FILE_NAME))
    }

    /// Remove the temporary directory, if any.
    pub fn remove_temp_dir(&self) {
        let previous = self
            .temp_dir
            .lock()
            .recover_poison("CoverageOverlay::remove_temp_dir")
            .take();
        if let Some(dir) = previous {
            Self::remove_dir(dir);
        }
    }

    fn remove_dir(dir: TempDir) {
        let path = dir.path().to_path_buf();
        if let Err(err) = dir.close() {
            log::warn!(
                target: LOG_TARGET,
                "Failed to remove coverage directory {}: {}",
                path.display(),
                err
            );
        }
    }

    /// Remove the report directory and every overlay.
    pub fn teardown(&self, documents: &[Arc<dyn Document>]) {
        self.remove_temp_dir();
        self.clear(documents);
        self.store_ranges(Vec::new());
    }
}

impl Drop for CoverageOverlay {
    fn drop(&mut self) {
        self.remove_temp_dir();
    }
}

//! A document backed by a file on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{LockResultExt, ToolError, ToolResult};
use crate::format::apply_edits;
use crate::host::{Decoration, Document, DocumentId, LayerId, Range, TextEdit};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// A marker layer recorded by [`FileDocument`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerLayer {
    pub ranges: Vec<Range>,
    pub decoration: Option<Decoration>,
}

#[derive(Debug, Default)]
struct Buffer {
    text: String,
    layers: BTreeMap<u64, MarkerLayer>,
    next_layer: u64,
}

/// In-memory buffer loaded from a file.
///
/// Edits stay in memory until [`FileDocument::write_back`]. Marker layers are
/// only recorded, which lets the CLI print what an editor would highlight.
#[derive(Debug)]
pub struct FileDocument {
    id: DocumentId,
    path: PathBuf,
    valid: AtomicBool,
    buffer: Mutex<Buffer>,
}

impl FileDocument {
    pub fn open(path: impl Into<PathBuf>) -> ToolResult<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ToolError::filesystem(&path, e))?;
        Ok(Self::with_text(path, text))
    }

    /// A document for `path` holding `text`, without reading the file.
    pub fn with_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            id: DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)),
            path: path.into(),
            valid: AtomicBool::new(true),
            buffer: Mutex::new(Buffer {
                text: text.into(),
                ..Default::default()
            }),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Write the current buffer back to its file.
    pub fn write_back(&self) -> ToolResult<()> {
        let text = self.text();
        std::fs::write(&self.path, text).map_err(|e| ToolError::filesystem(&self.path, e))
    }

    /// Mark the document as closed.
    pub fn close(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Live marker layers, in creation order.
    pub fn layers(&self) -> Vec<MarkerLayer> {
        self.buffer
            .lock()
            .recover_poison("FileDocument::layers")
            .layers
            .values()
            .cloned()
            .collect()
    }
}

impl Document for FileDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn text(&self) -> String {
        self.buffer
            .lock()
            .recover_poison("FileDocument::text")
            .text
            .clone()
    }

    fn apply_edits(&self, edits: &[TextEdit]) {
        let mut buffer = self.buffer.lock().recover_poison("FileDocument::apply_edits");
        buffer.text = apply_edits(&buffer.text, edits);
    }

    fn add_marker_layer(&self) -> Option<LayerId> {
        let mut buffer = self
            .buffer
            .lock()
            .recover_poison("FileDocument::add_marker_layer");
        buffer.next_layer += 1;
        let id = buffer.next_layer;
        buffer.layers.insert(id, MarkerLayer::default());
        Some(LayerId(id))
    }

    fn mark_range(&self, layer: LayerId, range: Range) {
        let mut buffer = self.buffer.lock().recover_poison("FileDocument::mark_range");
        if let Some(layer) = buffer.layers.get_mut(&layer.0) {
            layer.ranges.push(range);
        }
    }

    fn decorate_layer(&self, layer: LayerId, decoration: &Decoration) {
        let mut buffer = self
            .buffer
            .lock()
            .recover_poison("FileDocument::decorate_layer");
        if let Some(layer) = buffer.layers.get_mut(&layer.0) {
            layer.decoration = Some(decoration.clone());
        }
    }

    fn destroy_marker_layer(&self, layer: LayerId) {
        self.buffer
            .lock()
            .recover_poison("FileDocument::destroy_marker_layer")
            .layers
            .remove(&layer.0);
    }
}

use std::sync::Arc;

use crate::host::{Document, Workspace};

/// A fixed set of roots and documents; the first document is the active one.
#[derive(Default)]
pub struct StaticWorkspace {
    roots: Vec<String>,
    documents: Vec<Arc<dyn Document>>,
}

impl std::fmt::Debug for StaticWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticWorkspace")
            .field("roots", &self.roots)
            .field(
                "documents",
                &self.documents.iter().map(|d| d.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl StaticWorkspace {
    pub fn new(roots: Vec<String>, documents: Vec<Arc<dyn Document>>) -> Self {
        Self { roots, documents }
    }
}

impl Workspace for StaticWorkspace {
    fn project_roots(&self) -> Vec<String> {
        self.roots.clone()
    }

    fn open_documents(&self) -> Vec<Arc<dyn Document>> {
        self.documents.clone()
    }

    fn active_document(&self) -> Option<Arc<dyn Document>> {
        self.documents.first().cloned()
    }
}

//! Project root selection for documents.

use path_clean::PathClean;
use std::fmt;
use std::path::{Path, PathBuf};

/// Cache key component naming the project a resolution belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RootKey {
    /// A local project root directory.
    Project(PathBuf),
    /// No project: resolution without a directory hint.
    Global,
}

impl RootKey {
    pub fn directory(&self) -> Option<&Path> {
        match self {
            RootKey::Project(path) => Some(path),
            RootKey::Global => None,
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootKey::Project(path) => write!(f, "{}", path.display()),
            RootKey::Global => f.write_str("<global>"),
        }
    }
}

/// A root naming a remote or virtual resource (`scheme://...`) is not local.
pub fn is_local_root(root: &str) -> bool {
    !root.is_empty() && !root.contains("://")
}

/// Keep local roots only, lexically normalized, in their original order.
pub fn local_roots(roots: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots.iter().filter(|r| is_local_root(r)) {
        let cleaned = PathBuf::from(root).clean();
        if !result.contains(&cleaned) {
            result.push(cleaned);
        }
    }
    result
}

/// Pick the project root for a document.
///
/// The deepest root containing `document_path` wins; without one the first
/// local root is used, and with no local roots at all the global sentinel.
pub fn project_root_for(document_path: Option<&Path>, roots: &[PathBuf]) -> RootKey {
    if let Some(path) = document_path {
        let path = path.clean();
        let containing = roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count());
        if let Some(root) = containing {
            return RootKey::Project(root.clone());
        }
    }

    roots
        .first()
        .map(|root| RootKey::Project(root.clone()))
        .unwrap_or(RootKey::Global)
}

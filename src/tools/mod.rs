//! Tool resolution: which tools exist, where they live, and how to get them.

pub mod cache;
pub mod project;

pub use cache::{EnsureOutcome, RebuildOutcome, ToolResolutionCache};
pub use project::{RootKey, is_local_root, project_root_for};

use crate::host::{InstallKind, PackageSpec};

/// The stock source formatter. Ships with the toolchain.
pub const GOFMT: &str = "gofmt";
/// Formatter that also organizes imports.
pub const GOIMPORTS: &str = "goimports";
/// Formatter that also fills in zero-value returns.
pub const GORETURNS: &str = "goreturns";
/// Test runner binary.
pub const GO: &str = "go";
/// Coverage tool binary.
pub const COVER: &str = "cover";

/// Tools the formatting cache manages.
pub const FORMAT_TOOLS: &[&str] = &[GOFMT, GOIMPORTS, GORETURNS];

/// Tools the test runner needs, in resolution order.
pub const TEST_TOOLS: &[&str] = &[GO, COVER];

/// Package path for installable formatter tools.
///
/// `gofmt` has none: it cannot be fetched separately from the toolchain.
pub fn formatter_package(tool: &str) -> Option<&'static str> {
    match tool {
        GOIMPORTS => Some("golang.org/x/tools/cmd/goimports"),
        GORETURNS => Some("github.com/sqs/goreturns"),
        _ => None,
    }
}

/// Installer request for a missing formatter tool.
pub fn missing_formatter_spec(tool: &str) -> Option<PackageSpec> {
    formatter_package(tool).map(|package_path| PackageSpec {
        name: GOFMT.to_string(),
        package_name: tool.to_string(),
        package_path: package_path.to_string(),
        kind: InstallKind::Missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gofmt_is_not_installable() {
        assert_eq!(formatter_package(GOFMT), None);
        assert!(missing_formatter_spec(GOFMT).is_none());
    }

    #[test]
    fn goimports_spec_names_its_package() {
        let spec = missing_formatter_spec(GOIMPORTS).unwrap();
        assert_eq!(spec.package_name, "goimports");
        assert_eq!(spec.package_path, "golang.org/x/tools/cmd/goimports");
        assert_eq!(spec.kind, InstallKind::Missing);
    }

    #[test]
    fn unknown_tool_has_no_package() {
        assert!(formatter_package("rustfmt").is_none());
    }
}

//! Coverage profile parsing.
//!
//! A profile starts with a `mode:` header followed by one block per line:
//!
//! ```text
//! mode: set
//! example.com/pkg/a.go:1.13,3.2 2 1
//! example.com/pkg/a.go:5.14,6.3 1 0
//! ```
//!
//! `file:startLine.startCol,endLine.endCol numStatements hitCount`, all
//! positions 1-based.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{ToolError, ToolResult};
use crate::host::{Position, Range};

const LOG_TARGET: &str = "toolwright::coverage";

static BLOCK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+):(\d+)\.(\d+),(\d+)\.(\d+) (\d+) (\d+)$").expect("valid coverage regex")
});

/// One coverage block from a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRange {
    /// File path as written in the profile, with any `_/` prefix removed.
    pub file: PathBuf,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub statements: u32,
    pub hits: u64,
}

impl CoverageRange {
    pub fn is_covered(&self) -> bool {
        self.hits > 0
    }

    /// Zero-based editor range for this block.
    pub fn range(&self) -> Range {
        Range::new(
            Position::new(self.start_line.saturating_sub(1), self.start_column.saturating_sub(1)),
            Position::new(self.end_line.saturating_sub(1), self.end_column.saturating_sub(1)),
        )
    }

    /// Whether this block belongs to the document at `document_path`.
    pub fn matches(&self, document_path: &Path) -> bool {
        !self.file.as_os_str().is_empty() && document_path.ends_with(&self.file)
    }
}

/// Read and parse a profile from disk. Unreadable or malformed profiles
/// yield no ranges.
pub fn parse(report_path: &Path) -> Vec<CoverageRange> {
    let text = match std::fs::read_to_string(report_path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!(
                target: LOG_TARGET,
                "Failed to read coverage report {}: {}",
                report_path.display(),
                err
            );
            return Vec::new();
        }
    };

    match parse_report(&text) {
        Ok(ranges) => ranges,
        Err(err) => {
            log::warn!(
                target: LOG_TARGET,
                "Ignoring coverage report {}: {}",
                report_path.display(),
                err
            );
            Vec::new()
        }
    }
}

/// Parse profile text, failing on the first malformed block.
pub fn parse_report(text: &str) -> ToolResult<Vec<CoverageRange>> {
    let mut lines = text.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim_start().starts_with("mode:") => {}
        Some((_, header)) if header.trim().is_empty() => return Ok(Vec::new()),
        Some((_, header)) => {
            return Err(ToolError::parse(1, format!("expected mode header, got '{}'", header)));
        }
        None => return Ok(Vec::new()),
    }

    let mut ranges = Vec::new();
    for (index, line) in lines {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        ranges.push(parse_block(line).ok_or_else(|| {
            ToolError::parse(index + 1, format!("unrecognized block '{}'", line))
        })?);
    }
    Ok(ranges)
}

fn parse_block(line: &str) -> Option<CoverageRange> {
    let caps = BLOCK_LINE.captures(line)?;
    let number = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let file = caps.get(1)?.as_str();
    let file = file.strip_prefix("_/").unwrap_or(file);

    Some(CoverageRange {
        file: PathBuf::from(file),
        start_line: number(2)?,
        start_column: number(3)?,
        end_line: number(4)?,
        end_column: number(5)?,
        statements: number(6)?,
        hits: caps.get(7)?.as_str().parse().ok()?,
    })
}

//! Minimal line diffs between a buffer and formatter output.
//!
//! Formatting replaces only the lines that actually changed so the editor
//! keeps caret, selections and scroll position for untouched text.

use line_index::{LineCol, LineIndex, TextSize};
use similar::{DiffTag, TextDiff};

use crate::host::{Position, Range, TextEdit};

/// Edits that turn `old` into `new`, in ascending order, expressed against `old`.
pub fn compute_edits(old: &str, new: &str) -> Vec<TextEdit> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();

    // Byte offset at which each old line starts, plus the end of the text.
    let mut line_starts = Vec::with_capacity(old_lines.len() + 1);
    let mut offset = 0;
    line_starts.push(offset);
    for line in old_lines {
        offset += line.len();
        line_starts.push(offset);
    }

    let index = LineIndex::new(old);
    diff.ops()
        .iter()
        .filter_map(|op| {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            if tag == DiffTag::Equal {
                return None;
            }
            Some(TextEdit {
                range: Range::new(
                    position_at(&index, line_starts[old_range.start]),
                    position_at(&index, line_starts[old_range.end]),
                ),
                new_text: new_lines[new_range].concat(),
            })
        })
        .collect()
}

/// Apply non-overlapping edits expressed against `text`.
///
/// Edits whose positions fall outside `text` are skipped.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let index = LineIndex::new(text);
    let mut spans: Vec<(usize, usize, &str)> = edits
        .iter()
        .filter_map(|edit| {
            let start = offset_at(&index, edit.range.start)?;
            let end = offset_at(&index, edit.range.end)?;
            (start <= end && end <= text.len()).then_some((start, end, edit.new_text.as_str()))
        })
        .collect();
    spans.sort_by_key(|(start, end, _)| (*start, *end));

    let mut result = text.to_string();
    for (start, end, new_text) in spans.into_iter().rev() {
        result.replace_range(start..end, new_text);
    }
    result
}

fn position_at(index: &LineIndex, offset: usize) -> Position {
    let line_col = index.line_col(TextSize::new(offset as u32));
    Position::new(line_col.line, line_col.col)
}

fn offset_at(index: &LineIndex, position: Position) -> Option<usize> {
    index
        .offset(LineCol {
            line: position.line,
            col: position.column,
        })
        .map(|size| u32::from(size) as usize)
}

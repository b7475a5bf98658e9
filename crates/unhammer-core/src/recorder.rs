//! Deferred per-file text edits.
//!
//! An [`UpdateRecorder`] buffers `remove`/`insert_right` operations against a
//! single file and applies them as one coherent patch. Nothing is written
//! while operations are being recorded, which lets the analysis phase hold
//! stable byte offsets for the whole run.
//!
//! The recorder also keeps a displacement ledger: once edits are known,
//! [`UpdateRecorder::adjusted_offset`] maps a pre-edit offset to the position
//! the same text occupies after the patch. Diagnostics captured against the
//! original file are remapped through this ledger before being reported.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content, as a half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps another. Adjacent spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if this span contains a byte offset.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures detected when the buffered operations are applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    /// Two removals cover overlapping byte ranges.
    #[error("overlapping removals: {first} and {second}")]
    OverlappingRemovals { first: Span, second: Span },

    /// An operation extends beyond the end of the file.
    #[error("span {span} out of bounds for file of length {len}")]
    OutOfBounds { span: Span, len: usize },
}

// ============================================================================
// UpdateRecorder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditOp {
    Remove { span: Span },
    InsertRight { pos: usize, text: String },
}

impl EditOp {
    fn position(&self) -> usize {
        match self {
            EditOp::Remove { span } => span.start,
            EditOp::InsertRight { pos, .. } => *pos,
        }
    }

    fn bound(&self) -> usize {
        match self {
            EditOp::Remove { span } => span.end,
            EditOp::InsertRight { pos, .. } => *pos,
        }
    }

    fn is_insert(&self) -> bool {
        matches!(self, EditOp::InsertRight { .. })
    }
}

/// Append-only buffer of text edits for one file.
///
/// Operations are recorded in any order and applied once, in descending
/// position order (removals before insertions at equal positions), so earlier
/// edits never invalidate the offsets of later ones.
#[derive(Debug, Default, Clone)]
pub struct UpdateRecorder {
    ops: Vec<EditOp>,
}

impl UpdateRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        UpdateRecorder { ops: Vec::new() }
    }

    /// Returns true if no operations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Mark `width` bytes starting at `start` for removal.
    pub fn remove(&mut self, start: usize, width: usize) {
        self.remove_span(Span::new(start, start + width));
    }

    /// Mark a span for removal.
    pub fn remove_span(&mut self, span: Span) {
        if !span.is_empty() {
            self.ops.push(EditOp::Remove { span });
        }
    }

    /// Insert text at `pos`. Text recorded later at the same position lands
    /// to the right of text recorded earlier.
    pub fn insert_right(&mut self, pos: usize, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.ops.push(EditOp::InsertRight { pos, text });
        }
    }

    /// Replace a span with new text.
    pub fn replace_span(&mut self, span: Span, text: impl Into<String>) {
        self.remove_span(span);
        self.insert_right(span.start, text);
    }

    /// Remove a single element from a comma-separated list.
    ///
    /// See [`UpdateRecorder::remove_list_elements`].
    pub fn remove_list_element(&mut self, source: &str, elements: &[Span], index: usize) {
        self.remove_list_elements(source, elements, &[index]);
    }

    /// Remove elements from a comma-separated list (array literal, named
    /// import list), deleting exactly one adjacent comma per removed element
    /// so the remaining text stays syntactically valid for any N >= 1 and any
    /// combination of positions.
    ///
    /// `elements` are the element spans in source order; `indices` are the
    /// positions to delete (duplicates tolerated).
    pub fn remove_list_elements(&mut self, source: &str, elements: &[Span], indices: &[usize]) {
        if elements.is_empty() || indices.is_empty() {
            return;
        }
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        if sorted.len() == elements.len() {
            // Whole list emptied: take everything from the first element
            // through the last, plus a trailing comma if one follows.
            let start = elements[0].start;
            let mut end = elements[elements.len() - 1].end;
            end = skip_trailing_separator(source, end);
            self.remove_span(Span::new(start, end));
            return;
        }

        // Merge runs of consecutive indices so adjacent removals do not
        // produce overlapping spans.
        let mut run_start = 0;
        while run_start < sorted.len() {
            let mut run_end = run_start;
            while run_end + 1 < sorted.len() && sorted[run_end + 1] == sorted[run_end] + 1 {
                run_end += 1;
            }
            let first = sorted[run_start];
            let last = sorted[run_end];

            if last + 1 < elements.len() {
                // Run is followed by a kept element: remove through the
                // separating comma and whitespace up to the next element.
                self.remove_span(Span::new(elements[first].start, elements[last + 1].start));
            } else {
                // Run reaches the end of the list: eat the leading comma by
                // starting at the end of the previous (kept) element.
                let prev = elements[first - 1];
                self.remove_span(Span::new(prev.end, elements[last].end));
            }
            run_start = run_end + 1;
        }
    }

    /// Apply all recorded operations to `source`, producing the patched text.
    ///
    /// # Errors
    /// - [`RecorderError::OutOfBounds`] if an operation reaches past the file
    /// - [`RecorderError::OverlappingRemovals`] if two removals overlap
    pub fn apply(&self, source: &str) -> Result<String, RecorderError> {
        let len = source.len();
        for op in &self.ops {
            if op.bound() > len {
                let span = match op {
                    EditOp::Remove { span } => *span,
                    EditOp::InsertRight { pos, .. } => Span::new(*pos, *pos),
                };
                return Err(RecorderError::OutOfBounds { span, len });
            }
        }

        let mut removes: Vec<Span> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                EditOp::Remove { span } => Some(*span),
                EditOp::InsertRight { .. } => None,
            })
            .collect();
        removes.sort_by_key(|s| s.start);
        for pair in removes.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(RecorderError::OverlappingRemovals {
                    first: pair[0],
                    second: pair[1],
                });
            }
        }

        // Descending position order; removals before insertions at equal
        // positions; later-recorded insertions applied first so that earlier
        // text ends up to the left.
        let mut ordered: Vec<(usize, &EditOp)> = self.ops.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            match b.position().cmp(&a.position()) {
                Ordering::Equal => {}
                other => return other,
            }
            match (a.is_insert(), b.is_insert()) {
                (false, true) => Ordering::Less,
                (true, false) => Ordering::Greater,
                _ => ib.cmp(ia),
            }
        });

        let mut out = source.to_string();
        for (_, op) in ordered {
            match op {
                EditOp::Remove { span } => {
                    out.replace_range(span.start..span.end, "");
                }
                EditOp::InsertRight { pos, text } => {
                    out.insert_str(*pos, text);
                }
            }
        }
        Ok(out)
    }

    /// Map a pre-edit byte offset to the corresponding post-edit offset.
    ///
    /// Insertions at or before the offset shift it right; removals entirely
    /// before it shift it left; a removal containing the offset clamps it to
    /// the removal start.
    pub fn adjusted_offset(&self, offset: usize) -> usize {
        let mut delta: isize = 0;
        for op in &self.ops {
            match op {
                EditOp::Remove { span } => {
                    if span.end <= offset {
                        delta -= span.len() as isize;
                    } else if span.start < offset {
                        delta -= (offset - span.start) as isize;
                    }
                }
                EditOp::InsertRight { pos, text } => {
                    if *pos <= offset {
                        delta += text.len() as isize;
                    }
                }
            }
        }
        (offset as isize + delta).max(0) as usize
    }

    /// Returns true if the given offset falls inside any recorded removal.
    pub fn offset_removed(&self, offset: usize) -> bool {
        self.ops.iter().any(|op| match op {
            EditOp::Remove { span } => span.contains_offset(offset),
            EditOp::InsertRight { .. } => false,
        })
    }
}

/// Skip whitespace and at most one comma after `pos`.
fn skip_trailing_separator(source: &str, pos: usize) -> usize {
    let bytes = source.as_bytes();
    let mut end = pos;
    let mut probe = end;
    while probe < bytes.len() && bytes[probe].is_ascii_whitespace() {
        probe += 1;
    }
    if probe < bytes.len() && bytes[probe] == b',' {
        end = probe + 1;
    }
    end
}

// ============================================================================
// Tests
// ============================================================================

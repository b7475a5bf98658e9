//! Text position utilities.
//!
//! Lines and columns are 1-indexed (editor convention); byte offsets are
//! 0-indexed. Columns count Unicode scalar values, not bytes, so reported
//! positions are correct for user-facing diagnostics.

/// Convert a byte offset to a 1-indexed `(line, column)` pair.
///
/// If `offset` exceeds the content length, the position of the end of the
/// content is returned.
pub fn offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current = 0usize;

    for ch in content.chars() {
        if current >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current += ch.len_utf8();
    }

    (line, col)
}

/// Convert a 1-indexed `(line, column)` pair to a byte offset.
///
/// Values of 0 are clamped to 1. Positions past the end of a line clamp to
/// the line end; lines past the end of the content clamp to the content end.
pub fn position_to_offset(content: &str, line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let mut current_line = 1u32;
    for (i, ch) in content.char_indices() {
        if current_line == line {
            let mut current_col = 1u32;
            for (j, c) in content[i..].char_indices() {
                if current_col == col {
                    return i + j;
                }
                if c == '\n' {
                    break;
                }
                current_col += 1;
            }
            let line_end = content[i..]
                .find('\n')
                .map(|p| i + p)
                .unwrap_or(content.len());
            return line_end;
        }
        if ch == '\n' {
            current_line += 1;
        }
    }

    content.len()
}

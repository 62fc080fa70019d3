//! Byte offset <-> line/character conversion
//!
//! Characters are counted in UTF-16 code units, as editors speaking LSP
//! expect.

use serde::Serialize;

/// Zero-based line and UTF-16 character
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TextPosition {
    pub line: u32,
    pub character: u32,
}

/// Position of a byte offset; offsets past the end clamp to the end
pub fn position_at(text: &str, offset: usize) -> TextPosition {
    let mut line = 0u32;
    let mut character = 0u32;

    for (idx, ch) in text.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += ch.len_utf16() as u32;
        }
    }

    TextPosition { line, character }
}

/// Byte offset of a position; positions past a line end clamp to it
pub fn offset_at(text: &str, position: TextPosition) -> usize {
    let mut line = 0u32;
    let mut character = 0u32;

    for (idx, ch) in text.char_indices() {
        if line == position.line {
            if character >= position.character || ch == '\n' {
                return idx;
            }
            character += ch.len_utf16() as u32;
        } else if ch == '\n' {
            line += 1;
        }
    }

    text.len()
}

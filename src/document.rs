//! Line index over document text for LSP position handling.
//!
//! LSP positions count characters in UTF-16 code units, while Rust strings are
//! indexed by UTF-8 bytes. [`TextDocument`] converts between the two and keeps
//! every position it hands out inside the document.

use tower_lsp::lsp_types::{Position, Range};

/// Borrowed view of a document's text with precomputed line starts.
#[derive(Debug, Clone)]
pub struct TextDocument<'a> {
    text: &'a str,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

impl<'a> TextDocument<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Number of lines; a trailing newline starts a final empty line.
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    pub fn last_line(&self) -> u32 {
        self.line_count().saturating_sub(1)
    }

    /// Content of a line without its `\n` or `\r\n` terminator.
    ///
    /// A `\r` with no `\n` after it (end of text) is content, not a terminator.
    pub fn line(&self, line: u32) -> Option<&'a str> {
        let idx = line as usize;
        let start = *self.line_starts.get(idx)?;
        match self.line_starts.get(idx + 1) {
            Some(next) => {
                let content = &self.text[start..next - 1];
                Some(content.strip_suffix('\r').unwrap_or(content))
            }
            None => Some(&self.text[start..]),
        }
    }

    /// Length of a line in UTF-16 code units (0 for lines past the end).
    pub fn line_len_utf16(&self, line: u32) -> u32 {
        self.line(line).map(utf16_len).unwrap_or(0)
    }

    /// Range covering the whole document.
    pub fn full_range(&self) -> Range {
        let last = self.last_line();
        Range {
            start: Position::new(0, 0),
            end: Position::new(last, self.line_len_utf16(last)),
        }
    }

    /// Move a position onto the nearest valid spot: lines past the end go to
    /// the end of the document, characters past a line end go to its end.
    pub fn clamp_position(&self, position: Position) -> Position {
        if position.line > self.last_line() {
            let last = self.last_line();
            return Position::new(last, self.line_len_utf16(last));
        }
        let len = self.line_len_utf16(position.line);
        Position::new(position.line, position.character.min(len))
    }

    /// Clamp both ends of a range; an inverted range collapses onto its start.
    pub fn clamp_range(&self, range: Range) -> Range {
        let start = self.clamp_position(range.start);
        let end = self.clamp_position(range.end);
        if (end.line, end.character) < (start.line, start.character) {
            Range { start, end: start }
        } else {
            Range { start, end }
        }
    }

    /// Byte offset of a position, after clamping it.
    ///
    /// A position pointing into the middle of a surrogate pair resolves to
    /// the start of the following character.
    pub fn offset_at(&self, position: Position) -> usize {
        let position = self.clamp_position(position);
        let start = self.line_starts[position.line as usize];
        let line = self.line(position.line).unwrap_or("");

        let mut units = 0u32;
        for (byte_idx, ch) in line.char_indices() {
            if units >= position.character {
                return start + byte_idx;
            }
            units += ch.len_utf16() as u32;
        }
        start + line.len()
    }

    /// Text covered by a range (clamped to the document).
    pub fn slice(&self, range: Range) -> &'a str {
        let range = self.clamp_range(range);
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end);
        &self.text[start..end]
    }
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

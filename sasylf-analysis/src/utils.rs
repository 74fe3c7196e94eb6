use lsp_types::{Position, Range};

/// Line-oriented view over a document buffer.
///
/// Offsets are byte offsets into the source; LSP columns are UTF-16 code units,
/// which is what editors send by default.
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (idx, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    pub fn is_last_line(&self, line: u32) -> bool {
        line + 1 >= self.line_count()
    }

    /// Byte offset where `line` starts.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let text = &self.source[start..end];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Position of the end of `line`, before any terminator.
    pub fn line_end(&self, line: u32) -> Option<Position> {
        let text = self.line_text(line)?;
        Some(Position::new(line, utf16_len(text)))
    }

    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = utf16_len(self.source.get(start..offset).unwrap_or(""));
        Position::new(line as u32, column)
    }

    /// Byte offset for an LSP position, clamped to the line and the buffer.
    pub fn offset_at(&self, position: Position) -> usize {
        let Some(start) = self.line_start(position.line) else {
            return self.source.len();
        };
        let text = self.line_text(position.line).unwrap_or("");
        start + byte_index_for_column(text, position.character)
    }

    pub fn text_in(&self, range: Range) -> &'a str {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        &self.source[start..end]
    }
}

/// Range of `len` bytes starting at byte `start` of `line_text` on `line`.
pub fn line_span(line: u32, line_text: &str, start: usize, len: usize) -> Range {
    let end = (start + len).min(line_text.len());
    Range::new(
        Position::new(line, utf16_len(&line_text[..start])),
        Position::new(line, utf16_len(&line_text[..end])),
    )
}

pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

fn byte_index_for_column(text: &str, column: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in text.char_indices() {
        if units >= column {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    text.len()
}

/// Leading run of spaces and tabs.
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, ch)| *ch != ' ' && *ch != '\t')
        .map(|(idx, _)| idx)
        .unwrap_or(line.len());
    &line[..end]
}

/// Converts the checker's 1-based line/column to an LSP position.
pub fn from_one_based(line: u32, column: u32) -> Position {
    Position::new(line.saturating_sub(1), column.saturating_sub(1))
}

/// Zero-width range at a 1-based checker location.
pub fn point_range(line: u32, column: u32) -> Range {
    let position = from_one_based(line, column);
    Range::new(position, position)
}

pub fn is_single_line(range: &Range) -> bool {
    range.start.line == range.end.line
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '\'' | '.')
}

/// Identifier under the cursor, including `Module.` qualification.
pub fn word_at(source: &str, position: Position) -> Option<String> {
    let index = TextIndex::new(source);
    let line = index.line_text(position.line)?;
    let cursor = byte_index_for_column(line, position.character);

    let start = line[..cursor]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_identifier_char(*ch))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(cursor);
    let end = line[cursor..]
        .char_indices()
        .find(|(_, ch)| !is_identifier_char(*ch))
        .map(|(idx, _)| cursor + idx)
        .unwrap_or(line.len());

    let word = line[start..end].trim_matches('.');
    if word.is_empty() {
        None
    } else {
        Some(word.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_text_strips_terminators() {
        let index = TextIndex::new("first\r\nsecond\nthird");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_text(0), Some("first"));
        assert_eq!(index.line_text(1), Some("second"));
        assert_eq!(index.line_text(2), Some("third"));
        assert_eq!(index.line_text(3), None);
        assert!(index.is_last_line(2));
    }

    #[test]
    fn offsets_round_trip_through_positions() {
        let source = "ab\n  c∀d\n";
        let index = TextIndex::new(source);
        let offset = source.find('d').unwrap();
        let position = index.position_at(offset);
        assert_eq!(position, Position::new(1, 4));
        assert_eq!(index.offset_at(position), offset);
    }

    #[test]
    fn offset_at_clamps_past_line_end() {
        let index = TextIndex::new("abc\ndef");
        assert_eq!(index.offset_at(Position::new(0, 99)), 3);
        assert_eq!(index.offset_at(Position::new(9, 0)), 7);
    }

    #[test]
    fn leading_whitespace_handles_tabs() {
        assert_eq!(leading_whitespace("\t  by rule"), "\t  ");
        assert_eq!(leading_whitespace("none"), "");
        assert_eq!(leading_whitespace("   "), "   ");
    }

    #[test]
    fn word_at_picks_qualified_identifiers() {
        let source = "d1: n1 + n2 = n3 by rule Nat.plus-s on d2\n";
        let column = source.find("plus").unwrap() as u32;
        assert_eq!(
            word_at(source, Position::new(0, column)).as_deref(),
            Some("Nat.plus-s")
        );
        assert_eq!(word_at(source, Position::new(0, 1)).as_deref(), Some("d1"));
        assert_eq!(word_at(source, Position::new(0, 3)), None);
    }

    #[test]
    fn one_based_locations_convert() {
        assert_eq!(from_one_based(1, 1), Position::new(0, 0));
        assert_eq!(from_one_based(0, 0), Position::new(0, 0));
        assert_eq!(point_range(3, 5).start, Position::new(2, 4));
    }
}

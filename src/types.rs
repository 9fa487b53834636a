//! Core types used throughout the project.

use tower_lsp::lsp_types;

/// A range in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl From<lsp_types::Range> for SourceRange {
    fn from(range: lsp_types::Range) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

impl From<SourceRange> for lsp_types::Range {
    fn from(range: SourceRange) -> Self {
        Self { start: range.start.into(), end: range.end.into() }
    }
}

/// A position in source code (0-indexed, `character` counted in UTF-16 code units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: u32,
    pub character: u32,
}

impl From<lsp_types::Position> for SourcePosition {
    fn from(position: lsp_types::Position) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl From<SourcePosition> for lsp_types::Position {
    fn from(position: SourcePosition) -> Self {
        Self { line: position.line, character: position.character }
    }
}

impl SourcePosition {
    /// Converts a byte offset in `text` into a line/character position.
    ///
    /// Offsets past the end of the text map to the end position.
    #[must_use]
    pub fn from_offset(text: &str, offset: usize) -> Self {
        PositionCursor::new(text).advance_to(offset)
    }

    /// Converts this position into a byte offset in `text`.
    ///
    /// A character past the end of its line clamps to the line end; a line
    /// past the end of the text clamps to the text length.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_offset(self, text: &str) -> usize {
        let mut line = 0;
        let mut character = 0;
        for (index, ch) in text.char_indices() {
            if line == self.line && character >= self.character {
                return index;
            }
            if ch == '\n' {
                if line == self.line {
                    return index;
                }
                line += 1;
                character = 0;
            } else if line == self.line {
                character += ch.len_utf16() as u32;
            }
        }
        text.len()
    }
}

impl SourceRange {
    /// Builds a range from a byte-offset span of `text`.
    #[must_use]
    pub fn from_offsets(text: &str, start: usize, end: usize) -> Self {
        let mut cursor = PositionCursor::new(text);
        let start = cursor.advance_to(start);
        Self { start, end: cursor.advance_to(end) }
    }

    /// Checks if a position is within this range (both ends inclusive).
    #[must_use]
    pub const fn contains(&self, position: SourcePosition) -> bool {
        if position.line < self.start.line {
            return false;
        }
        if position.line == self.start.line && position.character < self.start.character {
            return false;
        }
        if position.line > self.end.line {
            return false;
        }
        if position.line == self.end.line && position.character > self.end.character {
            return false;
        }
        true
    }

    /// Checks if two ranges share at least one position.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Forward-only offset to position conversion over one text.
///
/// Converting ascending offsets costs one pass over the text in total. An
/// offset behind the cursor restarts from the beginning.
#[derive(Debug, Clone)]
pub struct PositionCursor<'a> {
    text: &'a str,
    /// Byte offset already consumed.
    offset: usize,
    /// Position of `offset`.
    position: SourcePosition,
}

impl<'a> PositionCursor<'a> {
    #[must_use]
    pub const fn new(text: &'a str) -> Self {
        Self { text, offset: 0, position: SourcePosition { line: 0, character: 0 } }
    }

    /// Position of byte `offset`, clamped to the end of the text.
    #[allow(clippy::cast_possible_truncation)] // len_utf16 is 1 or 2
    pub fn advance_to(&mut self, offset: usize) -> SourcePosition {
        if offset < self.offset {
            *self = Self::new(self.text);
        }

        let rest = self.text.get(self.offset..).unwrap_or_default();
        for ch in rest.chars() {
            if self.offset >= offset {
                break;
            }
            if ch == '\n' {
                self.position.line += 1;
                self.position.character = 0;
            } else {
                self.position.character += ch.len_utf16() as u32;
            }
            self.offset += ch.len_utf8();
        }
        self.position
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    const fn pos(line: u32, character: u32) -> SourcePosition {
        SourcePosition { line, character }
    }

    const fn range(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> SourceRange {
        SourceRange { start: pos(start_line, start_char), end: pos(end_line, end_char) }
    }

    #[rstest]
    #[case::before_start_line(pos(0, 5), range(1, 5, 2, 10), false)]
    #[case::before_start_char(pos(1, 4), range(1, 5, 2, 10), false)]
    #[case::at_start(pos(1, 5), range(1, 5, 2, 10), true)]
    #[case::middle_line(pos(1, 10), range(1, 5, 2, 10), true)]
    #[case::at_end(pos(2, 10), range(1, 5, 2, 10), true)]
    #[case::after_end_char(pos(2, 11), range(1, 5, 2, 10), false)]
    #[case::after_end_line(pos(3, 0), range(1, 5, 2, 10), false)]
    fn test_contains(
        #[case] position: SourcePosition,
        #[case] range: SourceRange,
        #[case] expected: bool,
    ) {
        assert_that!(range.contains(position), eq(expected));
    }

    #[rstest]
    #[case::start(0, pos(0, 0))]
    #[case::same_line(3, pos(0, 3))]
    #[case::after_newline(5, pos(1, 0))]
    #[case::second_line(7, pos(1, 2))]
    #[case::past_end(100, pos(1, 4))]
    fn test_from_offset(#[case] offset: usize, #[case] expected: SourcePosition) {
        assert_that!(SourcePosition::from_offset("abcd\nefgh", offset), eq(expected));
    }

    #[rstest]
    #[case::start(pos(0, 0), 0)]
    #[case::same_line(pos(0, 3), 3)]
    #[case::second_line(pos(1, 2), 7)]
    #[case::clamps_to_line_end(pos(0, 99), 4)]
    #[case::clamps_to_text_end(pos(9, 0), 9)]
    fn test_to_offset(#[case] position: SourcePosition, #[case] expected: usize) {
        assert_that!(position.to_offset("abcd\nefgh"), eq(expected));
    }

    #[googletest::test]
    fn utf16_columns_round_trip_through_multibyte_text() {
        let text = "héllo 😀 #{key}";
        let offset = text.find("#{").unwrap();
        let position = SourcePosition::from_offset(text, offset);

        // "héllo " is 6 UTF-16 units, the emoji 2 more, then a space.
        expect_that!(position, eq(pos(0, 9)));
        expect_that!(position.to_offset(text), eq(offset));
    }

    #[googletest::test]
    fn intersects_detects_overlap_and_touching_ranges() {
        expect_that!(range(0, 0, 0, 5).intersects(&range(0, 5, 0, 8)), eq(true));
        expect_that!(range(0, 0, 0, 5).intersects(&range(0, 6, 0, 8)), eq(false));
        expect_that!(range(0, 0, 2, 0).intersects(&range(1, 0, 1, 3)), eq(true));
    }

    #[googletest::test]
    fn cursor_converts_ascending_offsets_and_restarts_when_going_back() {
        let text = "ab\ncd\nef";
        let mut cursor = PositionCursor::new(text);

        expect_that!(cursor.advance_to(1), eq(pos(0, 1)));
        expect_that!(cursor.advance_to(4), eq(pos(1, 1)));
        expect_that!(cursor.advance_to(5), eq(pos(1, 2)));
        expect_that!(cursor.advance_to(2), eq(pos(0, 2)));
        expect_that!(cursor.advance_to(99), eq(pos(2, 2)));
    }

    #[googletest::test]
    fn cursor_matches_single_conversions_on_multibyte_text() {
        let text = "héllo\n😀 #{a} ü #{b}\n#{c}";
        let mut cursor = PositionCursor::new(text);

        for (offset, _) in text.char_indices() {
            expect_that!(cursor.advance_to(offset), eq(SourcePosition::from_offset(text, offset)));
        }
    }
}

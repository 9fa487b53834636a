//! Picks the text a quick edit works on and how the document is rewritten.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{
    SourcePosition,
    SourceRange,
};

#[allow(clippy::expect_used)] // literal pattern
static TAG_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>(.*?)</[^>]+>").expect("tag content pattern"));

#[allow(clippy::expect_used)] // literal pattern
static ATTRIBUTE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\S+)=["']([^"']+)["']"#).expect("attribute value pattern"));

#[allow(clippy::expect_used)] // literal pattern
static TH_TEXT_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"th:(text|utext)=["']([^"']+)["']"#).expect("th:text attribute pattern")
});

/// How the originating document span is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Wrap the span in `<span th:remove="tag" th:text="...">`.
    Wrap,
    /// Replace the span, an attribute value, with the reference.
    ReplaceValue,
    /// Insert ` th:text="..."` at the position of the opening tag's `>`.
    InsertAttribute { position: SourcePosition },
}

/// Text to externalize and where it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub text: String,
    pub range: SourceRange,
    pub kind: EditKind,
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("No valid text or variable found, try selecting some text or a variable")]
pub struct NothingSelected;

/// Resolves the edit target for `selection` in `document`.
///
/// An empty selection picks the tag content or attribute value around the
/// cursor, attribute values winning. Text that directly follows an opening
/// tag is retargeted to the tag's `th:text`/`th:utext` value if it has one,
/// otherwise the edit adds that attribute to the tag.
///
/// # Errors
/// Returns [`NothingSelected`] if the selection is empty and the cursor is
/// neither in tag content nor in an attribute value.
pub fn resolve_target(document: &str, selection: SourceRange) -> Result<EditTarget, NothingSelected> {
    let (start, end, is_attribute) = if selection.is_empty() {
        cursor_span(document, selection.start).ok_or(NothingSelected)?
    } else {
        let start = selection.start.to_offset(document);
        let end = selection.end.to_offset(document);
        (start.min(end), start.max(end), false)
    };

    let span_target = |start: usize, end: usize, kind: EditKind| EditTarget {
        text: document.get(start..end).unwrap_or_default().to_string(),
        range: SourceRange::from_offsets(document, start, end),
        kind,
    };

    if is_attribute {
        return Ok(span_target(start, end, EditKind::ReplaceValue));
    }

    let Some((tag_start, tag_close)) = preceding_opening_tag(document, start) else {
        return Ok(span_target(start, end, EditKind::Wrap));
    };

    let tag_text = document.get(tag_start..=tag_close).unwrap_or_default();
    if let Some(value) = TH_TEXT_ATTRIBUTE.captures(tag_text).and_then(|captures| captures.get(2)) {
        return Ok(span_target(
            tag_start + value.start(),
            tag_start + value.end(),
            EditKind::ReplaceValue,
        ));
    }

    let position = SourcePosition::from_offset(document, tag_close);
    Ok(span_target(start, end, EditKind::InsertAttribute { position }))
}

/// Byte span around an empty selection, and whether it is an attribute value.
fn cursor_span(document: &str, cursor: SourcePosition) -> Option<(usize, usize, bool)> {
    let line_start = SourcePosition { line: cursor.line, character: 0 }.to_offset(document);
    let line_text = document.get(line_start..)?.lines().next().unwrap_or_default();
    let column = SourcePosition { line: 0, character: cursor.character }.to_offset(line_text);

    let attribute = ATTRIBUTE_VALUE
        .captures_iter(line_text)
        .filter_map(|captures| captures.get(2))
        .find(|value| value.start() <= column && column <= value.end())
        .map(|value| (line_start + value.start(), line_start + value.end(), true));
    if attribute.is_some() {
        return attribute;
    }

    TAG_CONTENT
        .captures_iter(line_text)
        .filter_map(|captures| Some((captures.get(0)?, captures.get(1)?)))
        .find(|(whole, _)| whole.start() <= column && column <= whole.end())
        .map(|(_, inner)| (line_start + inner.start(), line_start + inner.end(), false))
}

/// Finds the opening tag that `offset` directly follows, whitespace aside.
///
/// Returns the offsets of its `<` and `>`. Closing tags yield `None`.
fn preceding_opening_tag(document: &str, offset: usize) -> Option<(usize, usize)> {
    let bytes = document.as_bytes();

    let mut cursor = offset.min(bytes.len());
    while cursor > 0 && bytes.get(cursor - 1).is_some_and(u8::is_ascii_whitespace) {
        cursor -= 1;
    }
    if cursor == 0 || bytes.get(cursor - 1) != Some(&b'>') {
        return None;
    }
    let tag_close = cursor - 1;

    let mut tag_start = tag_close;
    loop {
        if tag_start == 0 {
            return None;
        }
        match bytes.get(tag_start - 1) {
            Some(b'<') => return Some((tag_start - 1, tag_close)),
            Some(b'/') => return None,
            _ => tag_start -= 1,
        }
    }
}

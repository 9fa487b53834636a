//! Reference token (`#{key}`) scanning for template documents.

use std::sync::LazyLock;

use regex::Regex;

use crate::db::I18nDatabase;
use crate::input::source::SourceFile;
use crate::types::{
    PositionCursor,
    SourceRange,
};

/// Matches `#{...}` with a non-greedy inner key.
#[allow(clippy::expect_used)] // literal pattern
static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{(.*?)\}").expect("reference token pattern"));

/// A `#{key}` token found in a document.
///
/// `start`/`end` are byte offsets of the whole token (half-open).
#[derive(Debug, Clone, PartialEq, Eq, Hash, salsa::Update)]
pub struct ReferenceToken {
    pub key: String,
    pub start: usize,
    pub end: usize,
}

impl ReferenceToken {
    /// Range of the token. Tokens visited in document order share one pass
    /// of `cursor` over the text.
    pub fn range(&self, cursor: &mut PositionCursor<'_>) -> SourceRange {
        let start = cursor.advance_to(self.start);
        SourceRange { start, end: cursor.advance_to(self.end) }
    }
}

/// Finds all non-overlapping reference tokens in `text`, in document order.
#[must_use]
pub fn find_reference_tokens(text: &str) -> Vec<ReferenceToken> {
    REFERENCE_PATTERN
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let key = captures.get(1)?;
            Some(ReferenceToken {
                key: key.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Memoized token scan of a document revision.
#[salsa::tracked]
pub fn reference_tokens(db: &dyn I18nDatabase, file: SourceFile) -> Vec<ReferenceToken> {
    find_reference_tokens(file.text(db))
}

//! Inline translation previews for `#{key}` references.

use serde::{
    Deserialize,
    Serialize,
};
use tower_lsp::lsp_types::{
    InlayHint,
    InlayHintLabel,
    Range,
};

use crate::db::I18nDatabase;
use crate::indexer::store::ResourceIndex;
use crate::input::source::SourceFile;
use crate::syntax::reference_tokens;
use crate::types::{
    PositionCursor,
    SourcePosition,
    SourceRange,
};

/// Resolved value of one reference token, rendered before the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub range: Range,
    pub key: String,
    pub value: String,
}

/// Resolves every reference token of `source_file` in `locale`.
///
/// Tokens containing `cursor` (ends inclusive) are left alone so the raw key
/// stays editable, and unresolved keys produce nothing.
#[must_use]
pub fn get_annotations(
    db: &dyn I18nDatabase,
    source_file: SourceFile,
    index: &ResourceIndex,
    locale: &str,
    cursor: Option<SourcePosition>,
) -> Vec<Annotation> {
    let mut positions = PositionCursor::new(source_file.text(db));

    reference_tokens(db, source_file)
        .into_iter()
        .filter_map(|token| {
            let range = token.range(&mut positions);
            if cursor.is_some_and(|position| range.contains(position)) {
                return None;
            }
            let value = index.lookup(&token.key, locale)?;
            Some(Annotation { range: range.into(), key: token.key, value: value.to_string() })
        })
        .collect()
}

/// Converts annotations overlapping `range` into inlay hints.
#[must_use]
pub fn to_inlay_hints(annotations: &[Annotation], range: Range) -> Vec<InlayHint> {
    let requested = SourceRange::from(range);

    annotations
        .iter()
        .filter(|annotation| SourceRange::from(annotation.range).intersects(&requested))
        .map(|annotation| InlayHint {
            position: annotation.range.start,
            label: InlayHintLabel::String(annotation.value.clone()),
            kind: None,
            text_edits: None,
            tooltip: None,
            padding_left: None,
            padding_right: Some(true),
            data: None,
        })
        .collect()
}

/// What the client has to do after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayUpdate {
    /// Same annotations as last time.
    Unchanged,
    /// Remove all annotations.
    Clear,
    /// Replace all annotations with these.
    Render(Vec<Annotation>),
}

/// Remembers the last rendered `(key, value)` sequence to skip redundant pushes.
#[derive(Debug, Default)]
pub struct OverlayAnnotator {
    previous: Option<(String, Vec<(String, String)>)>,
}

impl OverlayAnnotator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass for a disabled overlay.
    pub fn clear(&mut self) -> OverlayUpdate {
        self.previous = None;
        OverlayUpdate::Clear
    }

    /// Pass for the document `uri` with freshly computed annotations.
    pub fn update(&mut self, uri: &str, annotations: Vec<Annotation>) -> OverlayUpdate {
        let sequence: Vec<(String, String)> = annotations
            .iter()
            .map(|annotation| (annotation.key.clone(), annotation.value.clone()))
            .collect();

        let unchanged = self
            .previous
            .as_ref()
            .is_some_and(|(previous_uri, previous)| previous_uri == uri && *previous == sequence);
        if unchanged {
            return OverlayUpdate::Unchanged;
        }

        self.previous = Some((uri.to_string(), sequence));
        OverlayUpdate::Render(annotations)
    }

    /// Forgets the last pass so the next one always renders.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }
}

//! Custom `thymeleaf-i18n/*` messages exchanged with the client.

use serde::{
    Deserialize,
    Serialize,
};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::{
    Position,
    Range,
    Url,
};

use crate::ide::overlay::Annotation;

pub const DID_CHANGE_SELECTION: &str = "thymeleaf-i18n/didChangeSelection";
pub const DID_CHANGE_VISIBLE_RANGES: &str = "thymeleaf-i18n/didChangeVisibleRanges";
pub const DID_CHANGE_ACTIVE_EDITOR: &str = "thymeleaf-i18n/didChangeActiveEditor";

/// Full annotation set of a document; an empty set clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationsParams {
    pub uri: Url,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug)]
pub enum DecorationsNotification {}

impl Notification for DecorationsNotification {
    type Params = DecorationsParams;
    const METHOD: &'static str = "thymeleaf-i18n/decorations";
}

/// Announces the active locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleChangedParams {
    pub locale: String,
    pub label: String,
}

#[derive(Debug)]
pub enum LocaleChangedNotification {}

impl Notification for LocaleChangedNotification {
    type Params = LocaleChangedParams;
    const METHOD: &'static str = "thymeleaf-i18n/localeChanged";
}

/// Primary cursor of an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionParams {
    pub uri: Url,
    pub position: Position,
}

/// The editor scrolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleRangesParams {
    pub uri: Url,
    #[serde(default)]
    pub visible_ranges: Vec<Range>,
}

/// Another editor became active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEditorParams {
    pub uri: Url,
    #[serde(default)]
    pub position: Option<Position>,
}

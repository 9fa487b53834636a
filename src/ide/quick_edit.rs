//! Quick edit: turn selected text into a resource entry and a `#{key}` reference.
//!
//! The workflow runs in two halves. [`plan`] asks the user everything it
//! needs against a snapshot of the index and returns a [`QuickEditPlan`];
//! nothing is changed until the caller applies the plan with
//! [`apply_to_index`], [`persist`] and the document edit it carries.

pub mod naming;
pub mod prompt;
pub mod selection;

use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;
use tower_lsp::lsp_types::TextEdit;

use self::naming::{
    derive_default_key,
    escape_newlines,
    normalize_key_input,
    reference_expression,
    title_case_value,
};
use self::prompt::Prompter;
use self::selection::{
    EditKind,
    EditTarget,
    NothingSelected,
    resolve_target,
};
use crate::indexer::store::ResourceIndex;
use crate::input::resource::{
    DEFAULT_LOCALE,
    ResourceError,
    write_entry,
};
use crate::syntax::find_reference_tokens;
use crate::types::SourceRange;

pub const CREATE_NEW_FILE: &str = "Create new file";
pub const KEY_EXISTS_MESSAGE: &str = "Variable name already exists";
pub const UPDATED_MESSAGE: &str = "Properties file updated";

const KEY_PROMPT: &str = "Enter a variable name";
const KEY_PLACEHOLDER: &str = "Enter variable name here";
const VALUE_PROMPT: &str = "Enter translation for current language";
const VALUE_PLACEHOLDER: &str = "Enter text here";
const FILE_PICK_PROMPT: &str = "Select message file to add variable/translation to";
const FILE_NAME_PROMPT: &str = "Enter a new filename";

#[derive(Error, Debug)]
pub enum QuickEditError {
    #[error(transparent)]
    NothingSelected(#[from] NothingSelected),

    #[error("No folder is available for a new resource file")]
    NoFolder,

    #[error("Error updating properties file: {0}")]
    Write(#[from] ResourceError),
}

/// Input of one quick edit.
#[derive(Debug, Clone)]
pub struct QuickEditRequest {
    pub document: String,
    pub selection: SourceRange,
    /// Active locale, lookup-normalized.
    pub locale: String,
    /// Explicitly configured resource folder.
    pub configured_folder: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
}

/// Entry to add to a resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub key: String,
    pub value: String,
}

/// Everything the user decided, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickEditPlan {
    pub key: String,
    /// `None` when an existing key is reused.
    pub write: Option<PendingWrite>,
    /// `None` when a reference was selected; the document keeps it as is.
    pub edit: Option<TextEdit>,
}

/// Asks the user for key, value and target file.
///
/// Returns `Ok(None)` when any prompt is cancelled.
///
/// # Errors
/// - Nothing usable under an empty selection
/// - "Create new file" chosen with no folder to put it in
pub async fn plan(
    prompter: &dyn Prompter,
    index: &ResourceIndex,
    request: &QuickEditRequest,
) -> Result<Option<QuickEditPlan>, QuickEditError> {
    let target = resolve_target(&request.document, request.selection)?;
    let trimmed = target.text.trim();

    if trimmed.starts_with("#{") {
        plan_translation(prompter, index, request, trimmed).await
    } else {
        plan_new_key(prompter, index, request, &target).await
    }
}

/// A selected `#{key}`: ask for its value in the active locale.
async fn plan_translation(
    prompter: &dyn Prompter,
    index: &ResourceIndex,
    request: &QuickEditRequest,
    reference: &str,
) -> Result<Option<QuickEditPlan>, QuickEditError> {
    let key = find_reference_tokens(reference).into_iter().next().map_or_else(
        || reference.trim_start_matches("#{").to_string(),
        |token| token.key,
    );

    let default_value = title_case_value(&key);
    let proposal = if default_value.is_empty() { VALUE_PLACEHOLDER } else { &default_value };
    let Some(value) = ask(prompter, VALUE_PROMPT, Some(proposal)).await else {
        return Ok(None);
    };

    let candidates = index.files_for_locale(&request.locale);
    let Some(path) = choose_file(prompter, index, request, &candidates).await? else {
        return Ok(None);
    };

    Ok(Some(QuickEditPlan {
        key: key.clone(),
        write: Some(PendingWrite { path, key, value }),
        edit: None,
    }))
}

/// Literal text: pick a key, reuse an identical value's key if offered.
async fn plan_new_key(
    prompter: &dyn Prompter,
    index: &ResourceIndex,
    request: &QuickEditRequest,
    target: &EditTarget,
) -> Result<Option<QuickEditPlan>, QuickEditError> {
    let trimmed = target.text.trim();
    let value = escape_newlines(trimmed);
    let existing_key = index.find_key_by_value(&value);

    let default_key = existing_key.map_or_else(|| derive_default_key(trimmed), str::to_string);
    let proposal = if default_key.is_empty() { KEY_PLACEHOLDER } else { &default_key };

    let key = loop {
        let Some(input) = ask(prompter, KEY_PROMPT, Some(proposal)).await else {
            return Ok(None);
        };

        if existing_key == Some(input.as_str()) {
            tracing::debug!(key = %input, "Reusing existing key");
            let edit = document_edit(target, &input);
            return Ok(Some(QuickEditPlan { key: input, write: None, edit: Some(edit) }));
        }

        let key = normalize_key_input(&input);
        if key.is_empty() {
            return Ok(None);
        }
        if index.contains_key(&key, DEFAULT_LOCALE) {
            prompter.show_error(KEY_EXISTS_MESSAGE).await;
            continue;
        }
        break key;
    };

    let candidates = index.files_for_locale(DEFAULT_LOCALE);
    let Some(path) = choose_file(prompter, index, request, &candidates).await? else {
        return Ok(None);
    };

    let edit = document_edit(target, &key);
    Ok(Some(QuickEditPlan {
        key: key.clone(),
        write: Some(PendingWrite { path, key, value }),
        edit: Some(edit),
    }))
}

/// Input box answer, trimmed; empty answers count as cancellation.
async fn ask(prompter: &dyn Prompter, prompt: &str, value: Option<&str>) -> Option<String> {
    let answer = prompter.input_box(prompt, value).await?;
    let answer = answer.trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

async fn choose_file(
    prompter: &dyn Prompter,
    index: &ResourceIndex,
    request: &QuickEditRequest,
    candidates: &[PathBuf],
) -> Result<Option<PathBuf>, QuickEditError> {
    let mut items: Vec<String> =
        candidates.iter().map(|path| path.display().to_string()).collect();
    items.push(CREATE_NEW_FILE.to_string());

    let Some(choice) = prompter.quick_pick(FILE_PICK_PROMPT, items).await else {
        return Ok(None);
    };
    if choice != CREATE_NEW_FILE {
        return Ok(Some(PathBuf::from(choice)));
    }

    let Some(file_name) = ask(prompter, FILE_NAME_PROMPT, None).await else {
        return Ok(None);
    };
    let folder = new_file_folder(index, request).ok_or(QuickEditError::NoFolder)?;
    Ok(Some(folder.join(file_name)))
}

/// Configured folder, else the folder of the first indexed file, else the workspace root.
fn new_file_folder(index: &ResourceIndex, request: &QuickEditRequest) -> Option<PathBuf> {
    request
        .configured_folder
        .clone()
        .or_else(|| index.first_path().and_then(Path::parent).map(Path::to_path_buf))
        .or_else(|| request.workspace_root.clone())
}

/// Rewrites the target span so it references `key`.
#[must_use]
pub fn document_edit(target: &EditTarget, key: &str) -> TextEdit {
    let reference = reference_expression(key);

    match target.kind {
        EditKind::Wrap => TextEdit {
            range: target.range.into(),
            new_text: format!(
                r#"<span th:remove="tag" th:text="{reference}">{}</span>"#,
                target.text
            ),
        },
        EditKind::ReplaceValue => TextEdit { range: target.range.into(), new_text: reference },
        EditKind::InsertAttribute { position } => TextEdit {
            range: SourceRange { start: position, end: position }.into(),
            new_text: format!(r#" th:text="{reference}""#),
        },
    }
}

/// Adds the planned entry to the in-memory index.
///
/// Returns a newly seen locale tag, if the entry created one.
pub fn apply_to_index(index: &mut ResourceIndex, write: &PendingWrite) -> Option<String> {
    index.add_entry(&write.path, &write.key, &write.value)
}

/// Writes the planned entry to its resource file.
///
/// # Errors
/// Returns [`QuickEditError::Write`] if the file cannot be read or written.
pub async fn persist(write: &PendingWrite) -> Result<(), QuickEditError> {
    write_entry(&write.path, &write.key, &write.value).await?;
    Ok(())
}

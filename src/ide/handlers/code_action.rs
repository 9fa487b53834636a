//! Code Action ハンドラー
//!
//! 開いているテンプレートの任意の範囲に対して、
//! テキストをリソースファイルへ切り出すアクションを提供します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeAction,
    CodeActionKind,
    CodeActionOrCommand,
    CodeActionParams,
    CodeActionResponse,
    Command,
};

use super::super::backend::Backend;
use super::execute_command::{
    PROCESS_SELECTION,
    ProcessSelectionArgs,
};

pub const EXTRACT_TITLE: &str = "Externalize text to resource file";

/// `textDocument/codeAction` リクエストを処理
pub async fn handle_code_action(
    backend: &Backend,
    params: CodeActionParams,
) -> Result<Option<CodeActionResponse>> {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, range = ?params.range, "Code Action request");

    if !backend.state.documents.lock().await.contains_key(&uri) {
        return Ok(Some(vec![]));
    }

    let wants_extract = params.context.only.as_ref().is_none_or(|kinds| {
        kinds.iter().any(|kind| CodeActionKind::REFACTOR_EXTRACT.as_str().starts_with(kind.as_str()))
    });
    if !wants_extract {
        return Ok(Some(vec![]));
    }

    Ok(Some(vec![extract_action(ProcessSelectionArgs { uri, range: params.range })]))
}

fn extract_action(args: ProcessSelectionArgs) -> CodeActionOrCommand {
    CodeActionOrCommand::CodeAction(CodeAction {
        title: EXTRACT_TITLE.to_string(),
        kind: Some(CodeActionKind::REFACTOR_EXTRACT),
        command: Some(Command {
            title: EXTRACT_TITLE.to_string(),
            command: PROCESS_SELECTION.to_string(),
            arguments: serde_json::to_value(args).ok().map(|value| vec![value]),
        }),
        ..CodeAction::default()
    })
}

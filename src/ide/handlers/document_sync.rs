//! Document synchronization handlers.

use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
};

use super::super::backend::Backend;

/// 開いたドキュメントをアクティブにして即座に描画する
pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "Document opened");

    backend.state.upsert_document(&uri, params.text_document.text).await;
    backend.state.focus_document(&uri, None).await;
    backend.render_overlay().await;
}

pub async fn handle_did_change(backend: &Backend, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;

    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };

    backend.state.upsert_document(&uri, change.text).await;
    backend.state.focus_document(&uri, None).await;
    backend.schedule_overlay().await;
}

/// 閉じたドキュメントを破棄する。再び開いたときに描画し直すため前回結果も忘れる
pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "Document closed");

    backend.state.remove_document(&uri).await;
    backend.invalidate_overlay().await;
}

//! LSP 機能ハンドラー
//!
//! `inlayHint` の処理を担当します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    InlayHint,
    InlayHintParams,
};

use super::super::backend::Backend;
use crate::ide::overlay::to_inlay_hints;

/// `textDocument/inlayHint` リクエストを処理
///
/// デコレーションと同じ注釈を、要求された範囲に絞って返す。
pub async fn handle_inlay_hint(
    backend: &Backend,
    params: InlayHintParams,
) -> Result<Option<Vec<InlayHint>>> {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, range = ?params.range, "Inlay hint request");

    let annotations = backend.annotations_for(&uri).await;
    Ok(Some(to_inlay_hints(&annotations, params.range)))
}

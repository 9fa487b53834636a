//! LSP サーバーの共有状態

use std::collections::HashMap;
use std::sync::Arc;

use salsa::Setter;
use tokio::sync::{
    Mutex,
    MutexGuard,
};
use tower_lsp::lsp_types::Url;

use crate::db::I18nDatabaseImpl;
use crate::ide::locale::LocaleRegistry;
use crate::indexer::store::ResourceIndex;
use crate::input::source::SourceFile;
use crate::types::SourcePosition;

/// Document the user is looking at and where the primary cursor is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorFocus {
    pub uri: Option<Url>,
    pub cursor: Option<SourcePosition>,
}

/// LSP サーバーの共有状態
///
/// # ロック順序
///
/// 複数のロックを同時に取得する場合は、以下の順序を厳守してください：
/// 1. `db`
/// 2. `documents`
/// 3. `store`
/// 4. `registry`
///
/// `focus` は単独でのみ取得する。クライアントへのリクエストを待つ間はどのロックも保持しない。
#[derive(Clone)]
pub struct ServerState {
    /// Salsa データベース
    pub db: Arc<Mutex<I18nDatabaseImpl>>,
    /// 開いているテンプレート（URI → `SourceFile`）
    pub documents: Arc<Mutex<HashMap<Url, SourceFile>>>,
    /// リソースファイルのインデックス
    pub store: Arc<Mutex<ResourceIndex>>,
    /// ロケールと選択中のロケール
    pub registry: Arc<Mutex<LocaleRegistry>>,
    /// アクティブなエディタ
    pub focus: Arc<Mutex<EditorFocus>>,
}

/// Guards needed for one overlay pass, taken in lock order.
pub type OverlayGuards<'a> = (
    MutexGuard<'a, I18nDatabaseImpl>,
    MutexGuard<'a, HashMap<Url, SourceFile>>,
    MutexGuard<'a, ResourceIndex>,
    MutexGuard<'a, LocaleRegistry>,
);

impl ServerState {
    #[must_use]
    pub fn new(db: I18nDatabaseImpl, registry: LocaleRegistry) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            documents: Arc::new(Mutex::new(HashMap::new())),
            store: Arc::new(Mutex::new(ResourceIndex::new())),
            registry: Arc::new(Mutex::new(registry)),
            focus: Arc::new(Mutex::new(EditorFocus::default())),
        }
    }

    /// `db` → `documents` → `store` → `registry` の順にロックを取得
    pub async fn lock_for_overlay(&self) -> OverlayGuards<'_> {
        let db = self.db.lock().await;
        let documents = self.documents.lock().await;
        let store = self.store.lock().await;
        let registry = self.registry.lock().await;
        (db, documents, store, registry)
    }

    /// `store` → `registry` の順にロックを取得
    pub async fn lock_store_and_registry(
        &self,
    ) -> (MutexGuard<'_, ResourceIndex>, MutexGuard<'_, LocaleRegistry>) {
        let store = self.store.lock().await;
        let registry = self.registry.lock().await;
        (store, registry)
    }

    /// Creates or updates the `SourceFile` of `uri`.
    ///
    /// Salsa では既存入力のテキストを差し替えるだけで、依存クエリが無効化される。
    pub async fn upsert_document(&self, uri: &Url, text: String) -> SourceFile {
        let mut db = self.db.lock().await;
        let mut documents = self.documents.lock().await;

        if let Some(existing) = documents.get(uri).copied() {
            existing.set_text(&mut *db).to(text);
            return existing;
        }

        let source_file = SourceFile::new(&*db, uri.to_string(), text);
        documents.insert(uri.clone(), source_file);
        source_file
    }

    /// Forgets a closed document. Returns true if it was open.
    pub async fn remove_document(&self, uri: &Url) -> bool {
        let removed = self.documents.lock().await.remove(uri).is_some();

        let mut focus = self.focus.lock().await;
        if focus.uri.as_ref() == Some(uri) {
            *focus = EditorFocus::default();
        }
        removed
    }

    /// Text of an open document.
    pub async fn document_text(&self, uri: &Url) -> Option<String> {
        let db = self.db.lock().await;
        let documents = self.documents.lock().await;
        documents.get(uri).map(|source_file| source_file.text(&*db).clone())
    }

    /// Makes `uri` the active document. Returns true if it was not already.
    pub async fn focus_document(&self, uri: &Url, cursor: Option<SourcePosition>) -> bool {
        let mut focus = self.focus.lock().await;
        let changed = focus.uri.as_ref() != Some(uri);
        focus.uri = Some(uri.clone());
        if changed || cursor.is_some() {
            focus.cursor = cursor;
        }
        changed
    }

    pub async fn focus(&self) -> EditorFocus {
        self.focus.lock().await.clone()
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("db", &"<I18nDatabaseImpl>")
            .field("documents", &"<HashMap<Url, SourceFile>>")
            .field("store", &"<ResourceIndex>")
            .field("registry", &"<LocaleRegistry>")
            .field("focus", &"<EditorFocus>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    fn state() -> ServerState {
        ServerState::new(I18nDatabaseImpl::default(), LocaleRegistry::default())
    }

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file://{path}")).unwrap()
    }

    #[googletest::test]
    fn clone_shares_state() {
        let state1 = state();
        let state2 = state1.clone();

        expect_that!(Arc::ptr_eq(&state1.db, &state2.db), eq(true));
        expect_that!(Arc::ptr_eq(&state1.store, &state2.store), eq(true));
        expect_that!(Arc::ptr_eq(&state1.registry, &state2.registry), eq(true));
    }

    #[googletest::test]
    fn debug_impl_works() {
        let debug_str = format!("{:?}", state());

        expect_that!(debug_str, contains_substring("ServerState"));
        expect_that!(debug_str, contains_substring("documents"));
        expect_that!(debug_str, contains_substring("registry"));
    }

    #[tokio::test]
    async fn upsert_reuses_the_source_file() {
        let state = state();
        let uri = uri("/templates/page.html");

        let first = state.upsert_document(&uri, "#{a}".to_string()).await;
        let second = state.upsert_document(&uri, "#{b}".to_string()).await;

        assert!(first == second);
        assert_eq!(state.document_text(&uri).await.as_deref(), Some("#{b}"));
    }

    #[tokio::test]
    async fn closing_the_active_document_clears_focus() {
        let state = state();
        let uri = uri("/templates/page.html");
        state.upsert_document(&uri, String::new()).await;
        state.focus_document(&uri, None).await;

        assert!(state.remove_document(&uri).await);

        assert_eq!(state.focus().await, EditorFocus::default());
        assert_eq!(state.document_text(&uri).await, None);
    }

    #[tokio::test]
    async fn focus_keeps_cursor_unless_document_changes() {
        let state = state();
        let page = uri("/templates/page.html");
        let cursor = SourcePosition { line: 2, character: 4 };

        assert!(state.focus_document(&page, Some(cursor)).await);
        assert!(!state.focus_document(&page, None).await);
        assert_eq!(state.focus().await.cursor, Some(cursor));

        assert!(state.focus_document(&uri("/templates/other.html"), None).await);
        assert_eq!(state.focus().await.cursor, None);
    }
}

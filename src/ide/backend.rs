//! LSP Backend 実装

use std::collections::{
    BTreeSet,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{
    UnboundedReceiver,
    unbounded_channel,
};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::request::InlayHintRefreshRequest;
use tower_lsp::lsp_types::{
    CodeActionParams,
    CodeActionResponse,
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions,
    DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    ExecuteCommandParams,
    FileSystemWatcher,
    GlobPattern,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    InlayHint,
    InlayHintParams,
    MessageType,
    OneOf,
    Range,
    Registration,
    RelativePattern,
    Unregistration,
    Url,
    WorkspaceEdit,
    WorkspaceFolder,
};
use tower_lsp::{
    Client,
    LanguageServer,
};

use super::handlers;
use crate::config::{
    CONFIG_FILE_NAME,
    ConfigManager,
    FileMatcher,
};
use crate::db::I18nDatabaseImpl;
use crate::ide::debounce::Debouncer;
use crate::ide::locale::LocaleRegistry;
use crate::ide::overlay::{
    Annotation,
    OverlayAnnotator,
    OverlayUpdate,
    get_annotations,
};
use crate::ide::protocol::{
    ActiveEditorParams,
    DecorationsNotification,
    DecorationsParams,
    LocaleChangedNotification,
    LocaleChangedParams,
    SelectionParams,
    VisibleRangesParams,
};
use crate::ide::quick_edit::prompt::{
    LspPrompter,
    Prompter,
};
use crate::ide::quick_edit::{
    self,
    QuickEditRequest,
    UPDATED_MESSAGE,
};
use crate::ide::state::ServerState;
use crate::indexer::store::ResourceIndex;
use crate::indexer::workspace::WorkspaceIndexer;
use crate::input::resource::load_resource_file;
use crate::storage::WorkspaceStateStorage;

/// Registration id of the file watchers.
const WATCHERS_REGISTRATION_ID: &str = "thymeleaf-i18n-watchers";
const LOCALE_PICKER_PLACEHOLDER: &str = "Select language";

/// LSP Backend
#[derive(Clone)]
pub struct Backend {
    /// LSP クライアント
    pub client: Client,
    /// 設定管理
    pub config_manager: Arc<Mutex<ConfigManager>>,
    /// ワークスペースインデクサー
    pub workspace_indexer: Arc<WorkspaceIndexer>,
    /// 共有状態
    pub state: ServerState,
    /// 直近のスキャンで使ったファイルマッチャー（単独でロックする）
    matcher: Arc<Mutex<Option<FileMatcher>>>,
    /// オーバーレイの前回結果（`registry` の後にロックする）
    annotator: Arc<Mutex<OverlayAnnotator>>,
    /// オーバーレイ再描画のデバウンス
    debouncer: Debouncer,
    /// ロケール変更の通知先。`initialized` で受信タスクに渡す
    locale_events: Arc<Mutex<Option<UnboundedReceiver<String>>>>,
    /// ファイル監視を登録済みか
    watchers_registered: Arc<AtomicBool>,
    /// 実行中の走査の数
    scans_running: Arc<AtomicUsize>,
    /// 走査中に変更されたリソースファイル（単独でロックする）
    scan_events: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config_manager", &"<ConfigManager>")
            .field("workspace_indexer", &"<WorkspaceIndexer>")
            .field("state", &self.state)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Creates the backend; the locale observer forwards changes to a channel
    /// drained once the client is initialized.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let (sender, receiver) = unbounded_channel();
        let mut registry = LocaleRegistry::default();
        registry.subscribe(move |tag| {
            if sender.send(tag.to_string()).is_err() {
                tracing::debug!(tag, "Locale listener is gone");
            }
        });

        Self {
            client,
            config_manager: Arc::new(Mutex::new(ConfigManager::new())),
            workspace_indexer: Arc::new(WorkspaceIndexer::new()),
            state: ServerState::new(I18nDatabaseImpl::default(), registry),
            matcher: Arc::new(Mutex::new(None)),
            annotator: Arc::new(Mutex::new(OverlayAnnotator::new())),
            debouncer: Debouncer::new(),
            locale_events: Arc::new(Mutex::new(Some(receiver))),
            watchers_registered: Arc::new(AtomicBool::new(false)),
            scans_running: Arc::new(AtomicUsize::new(0)),
            scan_events: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// ワークスペースフォルダを取得
    ///
    /// # Errors
    /// クライアントとの通信に失敗した場合
    pub(crate) async fn get_workspace_folders(&self) -> Result<Vec<WorkspaceFolder>> {
        self.client.workspace_folders().await.map(Option::unwrap_or_default)
    }

    pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().map_or_else(
            |()| {
                tracing::warn!("Failed to convert URI to file path: {}", uri);
                None
            },
            Some,
        )
    }

    pub(crate) fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
    }

    /// 設定されたステートファイルから選択中のロケールを復元する
    pub(crate) async fn attach_state_store(&self) {
        let Some(path) = self.config_manager.lock().await.state_file_path() else {
            return;
        };
        tracing::debug!(path = %path.display(), "Using workspace state file");
        self.state.registry.lock().await.attach_store(Arc::new(WorkspaceStateStorage::new(path)));
    }

    /// Spawns the task that announces locale changes. Runs once.
    pub(crate) async fn spawn_locale_listener(&self) {
        let Some(mut receiver) = self.locale_events.lock().await.take() else {
            return;
        };
        let backend = self.clone();
        tokio::spawn(async move {
            while let Some(tag) = receiver.recv().await {
                backend.announce_locale(&tag).await;
            }
        });
    }

    /// Tells the client which locale is active and re-renders the overlay.
    pub(crate) async fn announce_locale(&self, tag: &str) {
        let label = self.state.registry.lock().await.label(tag);
        self.client
            .send_notification::<LocaleChangedNotification>(LocaleChangedParams {
                locale: tag.to_string(),
                label,
            })
            .await;
        self.client.log_message(MessageType::INFO, format!("Language set to {tag}")).await;
        self.render_overlay().await;
    }

    /// リソースルートを全走査してインデックスを置き換える
    ///
    /// 後から始まった走査があれば、この結果は捨てる。
    pub(crate) async fn rescan(&self) {
        let (resource_root, settings) = {
            let config_manager = self.config_manager.lock().await;
            (config_manager.resource_root(), config_manager.get_settings().clone())
        };

        let Some(resource_root) = resource_root else {
            tracing::warn!("No resource folder available; index is empty");
            *self.matcher.lock().await = None;
            self.install_index(ResourceIndex::new()).await;
            return;
        };

        let matcher = match FileMatcher::new(resource_root, &settings) {
            Ok(matcher) => matcher,
            Err(error) => {
                tracing::error!(%error, "Invalid file patterns; index is empty");
                self.client
                    .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
                    .await;
                *self.matcher.lock().await = None;
                self.install_index(ResourceIndex::new()).await;
                return;
            }
        };
        *self.matcher.lock().await = Some(matcher.clone());

        let num_threads = settings.indexing.effective_num_threads();
        self.scans_running.fetch_add(1, Ordering::SeqCst);
        let result = self.workspace_indexer.scan(&matcher, num_threads).await;
        self.scans_running.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(outcome) => {
                if !self.workspace_indexer.is_latest(outcome.generation) {
                    tracing::debug!(generation = outcome.generation, "Discarding stale scan");
                    return;
                }
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("Indexed {} resource files", outcome.index.len()),
                    )
                    .await;
                self.finish_scan(outcome.index).await;
            }
            Err(error) => {
                tracing::error!(%error, "Resource scan failed");
                self.install_index(ResourceIndex::new()).await;
            }
        }
    }

    /// Installs a scan result, then re-reads the files whose events arrived
    /// while the scan was running.
    async fn finish_scan(&self, index: ResourceIndex) {
        self.install_index(index).await;

        let paths = std::mem::take(&mut *self.scan_events.lock().await);
        if paths.is_empty() {
            return;
        }
        tracing::debug!(count = paths.len(), "Re-reading files changed during the scan");
        for path in paths {
            if self.is_resource_file(&path).await {
                self.reload_resource_file(&path).await;
            } else {
                self.remove_resource_file(&path).await;
            }
        }
        self.render_overlay().await;
    }

    /// Remembers `path` if a scan is running, so its result does not hide the change.
    async fn note_scan_event(&self, path: &Path) {
        if self.scans_running.load(Ordering::SeqCst) > 0 {
            self.scan_events.lock().await.insert(path.to_path_buf());
        }
    }

    /// Swaps in a freshly built index and reconciles the locales with it.
    async fn install_index(&self, index: ResourceIndex) {
        {
            let (mut store, mut registry) = self.state.lock_store_and_registry().await;
            let tags = index.locale_tags();
            *store = index;

            for tag in &tags {
                registry.add_locale(tag);
            }
            registry.retain_discovered(&tags);
            registry.validate_active();
        }
        self.render_overlay().await;
    }

    pub(crate) async fn is_resource_file(&self, path: &Path) -> bool {
        self.matcher.lock().await.as_ref().is_some_and(|matcher| matcher.is_resource_file(path))
    }

    /// 作成・変更されたリソースファイルを読み直す
    ///
    /// 読めなかったファイルはインデックスから外す。
    pub(crate) async fn reload_resource_file(&self, path: &Path) {
        self.note_scan_event(path).await;
        match load_resource_file(path).await {
            Ok(file) => {
                let (mut store, mut registry) = self.state.lock_store_and_registry().await;
                if let Some(tag) = store.insert(file) {
                    registry.add_locale(&tag);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "Dropping unreadable resource file");
                self.remove_resource_file(path).await;
            }
        }
    }

    pub(crate) async fn remove_resource_file(&self, path: &Path) {
        self.note_scan_event(path).await;
        let (mut store, mut registry) = self.state.lock_store_and_registry().await;
        if let Some(tag) = store.remove(path) {
            registry.remove_locale(&tag);
        }
    }

    /// 設定ファイルを読み直し、必要なら再走査する
    pub(crate) async fn reload_config_file(&self) {
        let mut config_manager = self.config_manager.lock().await;
        let workspace_root = config_manager.workspace_root().cloned();
        let previous = config_manager.get_settings().clone();

        if let Err(error) = config_manager.load_settings(workspace_root) {
            drop(config_manager);
            tracing::error!(%error, "Configuration error");
            self.client
                .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
                .await;
            return;
        }
        let rescan = config_manager.scan_inputs_differ(&previous);
        let state_file_changed = config_manager.get_settings().state_file != previous.state_file;
        drop(config_manager);

        self.after_settings_change(rescan, state_file_changed).await;
    }

    pub(crate) async fn after_settings_change(&self, rescan: bool, state_file_changed: bool) {
        if state_file_changed {
            self.attach_state_store().await;
            let active = self.state.registry.lock().await.active().to_string();
            self.announce_locale(&active).await;
        }
        if rescan {
            self.rescan().await;
            self.register_file_watchers().await;
        }
    }

    /// Annotations of `uri` for the active locale, or none when the overlay is off.
    pub(crate) async fn annotations_for(&self, uri: &Url) -> Vec<Annotation> {
        let focus = self.state.focus().await;
        let cursor = if focus.uri.as_ref() == Some(uri) { focus.cursor } else { None };

        let (db, documents, store, registry) = self.state.lock_for_overlay().await;
        if registry.is_off() {
            return Vec::new();
        }
        documents.get(uri).map_or_else(Vec::new, |source_file| {
            get_annotations(&*db, *source_file, &store, registry.active_for_lookup(), cursor)
        })
    }

    /// Forgets the last rendered overlay so the next pass always pushes.
    pub(crate) async fn invalidate_overlay(&self) {
        self.annotator.lock().await.invalidate();
    }

    /// アクティブなドキュメントのオーバーレイを更新して送信する
    ///
    /// 送信した場合は `true`。前回と同じ内容なら何も送らない。
    pub async fn render_overlay(&self) -> bool {
        let focus = self.state.focus().await;
        let Some(uri) = focus.uri else {
            return false;
        };

        let update = {
            let (db, documents, store, registry) = self.state.lock_for_overlay().await;
            let mut annotator = self.annotator.lock().await;
            if registry.is_off() {
                annotator.clear()
            } else {
                let Some(source_file) = documents.get(&uri).copied() else {
                    return false;
                };
                let annotations = get_annotations(
                    &*db,
                    source_file,
                    &store,
                    registry.active_for_lookup(),
                    focus.cursor,
                );
                annotator.update(uri.as_str(), annotations)
            }
        };

        let annotations = match update {
            OverlayUpdate::Unchanged => return false,
            OverlayUpdate::Clear => Vec::new(),
            OverlayUpdate::Render(annotations) => annotations,
        };
        tracing::debug!(uri = %uri, count = annotations.len(), "Pushing decorations");

        self.client
            .send_notification::<DecorationsNotification>(DecorationsParams { uri, annotations })
            .await;
        if let Err(error) = self.client.send_request::<InlayHintRefreshRequest>(()).await {
            tracing::debug!(%error, "Inlay hint refresh failed");
        }
        true
    }

    /// Re-renders after the configured debounce delay.
    pub(crate) async fn schedule_overlay(&self) {
        let debounce_ms = self.config_manager.lock().await.get_settings().overlay.debounce_ms;
        let backend = self.clone();
        self.debouncer.arm(Duration::from_millis(debounce_ms), async move {
            backend.render_overlay().await;
        });
    }

    /// リソースファイルと設定ファイルの監視を登録する
    ///
    /// 登録済みなら一度解除してから登録し直す。
    pub(crate) async fn register_file_watchers(&self) {
        let (resource_root, suffix) = {
            let config_manager = self.config_manager.lock().await;
            (
                config_manager.resource_root(),
                config_manager.get_settings().resource_suffix.clone(),
            )
        };

        let resource_pattern = format!("**/*{suffix}");
        let resource_glob = match resource_root.as_deref().map(Url::from_directory_path) {
            Some(Ok(base_uri)) => GlobPattern::Relative(RelativePattern {
                base_uri: OneOf::Right(base_uri),
                pattern: resource_pattern,
            }),
            _ => GlobPattern::String(resource_pattern),
        };
        let watchers = vec![
            FileSystemWatcher { glob_pattern: resource_glob, kind: None },
            FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/{CONFIG_FILE_NAME}")),
                kind: None,
            },
        ];

        let register_options =
            match serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers }) {
                Ok(options) => options,
                Err(error) => {
                    tracing::error!(%error, "Failed to serialize watcher options");
                    return;
                }
            };

        if self.watchers_registered.swap(false, Ordering::SeqCst) {
            let unregistration = Unregistration {
                id: WATCHERS_REGISTRATION_ID.to_string(),
                method: "workspace/didChangeWatchedFiles".to_string(),
            };
            if let Err(error) = self.client.unregister_capability(vec![unregistration]).await {
                tracing::debug!(%error, "Failed to unregister file watchers");
            }
        }

        let registration = Registration {
            id: WATCHERS_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        match self.client.register_capability(vec![registration]).await {
            Ok(()) => {
                self.watchers_registered.store(true, Ordering::SeqCst);
                tracing::debug!(%suffix, "File watchers registered");
            }
            Err(error) => tracing::warn!(%error, "Failed to register file watchers"),
        }
    }

    /// Quick edit of `selection` in the document `uri`, prompting through the client.
    pub(crate) async fn run_quick_edit(&self, uri: &Url, selection: Range) {
        let prompter = LspPrompter::new(self.client.clone());
        self.run_quick_edit_with(&prompter, uri, selection).await;
    }

    /// Quick edit of `selection` in the document `uri`.
    ///
    /// The plan is built against a snapshot of the index, so no lock is held
    /// while the user answers prompts.
    pub async fn run_quick_edit_with(&self, prompter: &dyn Prompter, uri: &Url, selection: Range) {
        let Some(document) = self.state.document_text(uri).await else {
            tracing::warn!(uri = %uri, "Quick edit on a document that is not open");
            return;
        };

        let (configured_folder, workspace_root) = {
            let config_manager = self.config_manager.lock().await;
            let configured_folder = config_manager
                .get_settings()
                .folder
                .as_ref()
                .and_then(|_| config_manager.resource_root());
            (configured_folder, config_manager.workspace_root().cloned())
        };
        let (index, locale) = {
            let (store, registry) = self.state.lock_store_and_registry().await;
            (store.clone(), registry.active_for_lookup().to_string())
        };

        let request = QuickEditRequest {
            document,
            selection: selection.into(),
            locale,
            configured_folder,
            workspace_root,
        };
        let plan = match quick_edit::plan(prompter, &index, &request).await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::debug!("Quick edit cancelled");
                return;
            }
            Err(error) => {
                prompter.show_error(&error.to_string()).await;
                return;
            }
        };

        if let Some(write) = &plan.write {
            {
                let (mut store, mut registry) = self.state.lock_store_and_registry().await;
                if let Some(tag) = quick_edit::apply_to_index(&mut store, write) {
                    registry.add_locale(&tag);
                }
            }
            match quick_edit::persist(write).await {
                Ok(()) => prompter.show_info(UPDATED_MESSAGE).await,
                Err(error) => {
                    tracing::error!(%error, path = %write.path.display(), "Quick edit write failed");
                    prompter.show_error(&error.to_string()).await;
                }
            }
        }

        if let Some(edit) = plan.edit {
            let changes = HashMap::from([(uri.clone(), vec![edit])]);
            match self
                .client
                .apply_edit(WorkspaceEdit { changes: Some(changes), ..Default::default() })
                .await
            {
                Ok(response) if !response.applied => {
                    tracing::warn!(reason = ?response.failure_reason, "Document edit rejected");
                }
                Ok(_) => {}
                Err(error) => tracing::error!("Failed to apply workspace edit: {}", error),
            }
        }

        tracing::info!(key = %plan.key, "Quick edit finished");
        self.render_overlay().await;
    }

    /// Sets the active locale. Unknown tags are rejected.
    pub(crate) async fn set_locale(&self, tag: &str) -> bool {
        let mut registry = self.state.registry.lock().await;
        if !registry.is_known(tag) {
            drop(registry);
            tracing::warn!(tag, "Unknown locale");
            self.client
                .show_message(MessageType::WARNING, format!("Unknown language: {tag}"))
                .await;
            return false;
        }
        registry.set_active(tag);
        true
    }

    /// 言語選択ピッカーを表示し、選ばれたロケールに切り替える
    pub(crate) async fn show_locale_options(&self) {
        let items = self.state.registry.lock().await.picker_items();
        let labels = items.iter().map(|entry| entry.label.clone()).collect();

        let prompter = LspPrompter::new(self.client.clone());
        let Some(choice) = prompter.quick_pick(LOCALE_PICKER_PLACEHOLDER, labels).await else {
            return;
        };
        if let Some(entry) = items.into_iter().find(|entry| entry.label == choice) {
            self.set_locale(&entry.tag).await;
        }
    }

    /// `thymeleaf-i18n/didChangeSelection`: debounced re-render without the token under the cursor.
    pub async fn did_change_selection(&self, params: SelectionParams) {
        self.state.focus_document(&params.uri, Some(params.position.into())).await;
        self.schedule_overlay().await;
    }

    /// `thymeleaf-i18n/didChangeVisibleRanges`
    pub async fn did_change_visible_ranges(&self, params: VisibleRangesParams) {
        tracing::trace!(uri = %params.uri, ranges = params.visible_ranges.len(), "Visible ranges");
        self.schedule_overlay().await;
    }

    /// `thymeleaf-i18n/didChangeActiveEditor`: immediate re-render.
    pub async fn did_change_active_editor(&self, params: ActiveEditorParams) {
        self.state.focus_document(&params.uri, params.position.map(Into::into)).await;
        self.debouncer.cancel();
        self.render_overlay().await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::lifecycle::handle_initialize(self, params).await
    }

    async fn initialized(&self, params: InitializedParams) {
        handlers::lifecycle::handle_initialized(self, params).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handlers::lifecycle::handle_shutdown(self).await
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::workspace::handle_did_change_configuration(self, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::workspace::handle_did_change_watched_files(self, params).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        handlers::workspace::handle_did_change_workspace_folders(self, params).await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::document_sync::handle_did_open(self, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::document_sync::handle_did_change(self, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::document_sync::handle_did_close(self, params).await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        handlers::code_action::handle_code_action(self, params).await
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        handlers::execute_command::handle_execute_command(self, params).await
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        handlers::features::handle_inlay_hint(self, params).await
    }
}

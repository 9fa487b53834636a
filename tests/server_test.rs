//! LSP サーバー全体の動作に関するテスト

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]
#![allow(deprecated)]

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{
    Value,
    json,
};
use tempfile::TempDir;
use thymeleaf_i18n_language_server::Backend;
use thymeleaf_i18n_language_server::ide::overlay::Annotation;
use thymeleaf_i18n_language_server::ide::protocol::SelectionParams;
use thymeleaf_i18n_language_server::ide::quick_edit::prompt::Prompter;
use tower_lsp::lsp_types::*;
use tower_lsp::{
    LanguageServer,
    LspService,
    async_trait,
};

fn create_test_backend() -> Backend {
    let (service, _socket) = LspService::new(Backend::new);
    service.inner().clone()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `templates/page.html` を開いた状態のサーバー
async fn start_server(workspace: &TempDir) -> (Backend, Url) {
    let backend = create_test_backend();
    let root_uri = Url::from_directory_path(workspace.path()).unwrap();

    backend
        .initialize(InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: "workspace".to_string(),
            }]),
            ..InitializeParams::default()
        })
        .await
        .unwrap();
    backend.initialized(InitializedParams {}).await;

    let page = workspace.path().join("templates/page.html");
    let uri = Url::from_file_path(&page).unwrap();
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "html".to_string(),
                version: 1,
                text: fs::read_to_string(&page).unwrap(),
            },
        })
        .await;

    (backend, uri)
}

fn sample_workspace() -> TempDir {
    let workspace = TempDir::new().unwrap();
    write(workspace.path(), "i18n/messages.properties", "greeting=Hello\nbye=Bye\n");
    write(workspace.path(), "i18n/messages_fr.properties", "# French\ngreeting=Bonjour\n");
    write(workspace.path(), "target/messages_es.properties", "greeting=Hola\n");
    write(
        workspace.path(),
        ".thymeleaf-i18n.json",
        r#"{ "folder": "i18n", "overlay": { "debounceMs": 10 } }"#,
    );
    write(
        workspace.path(),
        "templates/page.html",
        "<h1 th:text=\"#{greeting}\">x</h1>\n<p th:text=\"#{bye}\">y</p>\n<p>#{unknown}</p>\n<p>Hello World</p>\n",
    );
    workspace
}

async fn execute(backend: &Backend, command: &str, arguments: Vec<Value>) -> Option<Value> {
    backend
        .execute_command(ExecuteCommandParams {
            command: command.to_string(),
            arguments,
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
}

async fn decorations(backend: &Backend, uri: &Url) -> Vec<(String, String)> {
    let value = execute(backend, "thymeleaf-i18n.getDecorations", vec![json!({ "uri": uri })])
        .await
        .unwrap();
    let annotations: Vec<Annotation> = serde_json::from_value(value).unwrap();
    annotations.into_iter().map(|a| (a.key, a.value)).collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

async fn replace_text(backend: &Backend, uri: &Url, version: i32, text: &str) {
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier { uri: uri.clone(), version },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        })
        .await;
}

/// Accepts every proposed value and the first offered item.
#[derive(Default)]
struct AcceptingPrompter {
    shown: Mutex<Vec<String>>,
}

impl AcceptingPrompter {
    fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for AcceptingPrompter {
    async fn input_box(&self, prompt: &str, value: Option<&str>) -> Option<String> {
        self.shown.lock().unwrap().push(format!("input:{prompt}:{}", value.unwrap_or_default()));
        value.map(str::to_string)
    }

    async fn quick_pick(&self, _placeholder: &str, items: Vec<String>) -> Option<String> {
        items.into_iter().next()
    }

    async fn show_error(&self, message: &str) {
        self.shown.lock().unwrap().push(format!("error:{message}"));
    }

    async fn show_info(&self, message: &str) {
        self.shown.lock().unwrap().push(format!("info:{message}"));
    }
}

#[tokio::test]
async fn test_initialize_advertises_capabilities() {
    let backend = create_test_backend();

    let result = backend.initialize(InitializeParams::default()).await.unwrap();

    let capabilities = result.capabilities;
    assert_eq!(
        capabilities.text_document_sync,
        Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
    );
    assert_eq!(capabilities.inlay_hint_provider, Some(OneOf::Left(true)));
    assert!(capabilities.code_action_provider.is_some());
    assert_eq!(
        capabilities.execute_command_provider.unwrap().commands,
        vec![
            "thymeleaf-i18n.processSelection",
            "thymeleaf-i18n.showLocaleOptions",
            "thymeleaf-i18n.setLocale",
            "thymeleaf-i18n.getLocales",
            "thymeleaf-i18n.getDecorations",
        ]
    );
}

#[tokio::test]
async fn test_decorations_follow_active_locale() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;

    assert_eq!(decorations(&backend, &uri).await, pairs(&[("greeting", "Hello"), ("bye", "Bye")]));

    let changed = execute(&backend, "thymeleaf-i18n.setLocale", vec![json!({ "locale": "fr" })]).await;
    assert_eq!(changed, Some(Value::Bool(true)));
    assert_eq!(decorations(&backend, &uri).await, pairs(&[("greeting", "Bonjour")]));

    execute(&backend, "thymeleaf-i18n.setLocale", vec![json!({ "locale": "Off" })]).await;
    assert_eq!(decorations(&backend, &uri).await, Vec::new());
}

#[tokio::test]
async fn test_unknown_locale_is_rejected() {
    let workspace = sample_workspace();
    let (backend, _) = start_server(&workspace).await;

    let changed = execute(&backend, "thymeleaf-i18n.setLocale", vec![json!({ "locale": "es" })]).await;

    assert_eq!(changed, Some(Value::Bool(false)));
}

#[tokio::test]
async fn test_get_locales_lists_reserved_and_discovered() {
    let workspace = sample_workspace();
    let (backend, _) = start_server(&workspace).await;

    let value = execute(&backend, "thymeleaf-i18n.getLocales", Vec::new()).await.unwrap();

    assert_eq!(
        value,
        json!({
            "active": "D",
            "locales": [
                { "tag": "Off", "label": "🚫 Off" },
                { "tag": "D", "label": "🌐 Default" },
                { "tag": "fr", "label": "🇫🇷 FR" }
            ]
        })
    );
}

#[tokio::test]
async fn test_selected_locale_is_persisted_and_restored() {
    let workspace = sample_workspace();
    {
        let (backend, _) = start_server(&workspace).await;
        execute(&backend, "thymeleaf-i18n.setLocale", vec![json!({ "locale": "fr" })]).await;
    }

    let state: Value = serde_json::from_str(
        &fs::read_to_string(workspace.path().join(".thymeleaf-i18n/state.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(state["curlanguage"], json!("fr"));

    let (restarted, uri) = start_server(&workspace).await;
    assert_eq!(decorations(&restarted, &uri).await, pairs(&[("greeting", "Bonjour")]));
}

#[tokio::test]
async fn test_watched_files_update_index_and_locales() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;
    let german = workspace.path().join("i18n/messages_de.properties");
    let german_uri = Url::from_file_path(&german).unwrap();

    fs::write(&german, "greeting=Hallo\n").unwrap();
    backend
        .did_change_watched_files(DidChangeWatchedFilesParams {
            changes: vec![FileEvent { uri: german_uri.clone(), typ: FileChangeType::CREATED }],
        })
        .await;
    execute(&backend, "thymeleaf-i18n.setLocale", vec![json!({ "locale": "de" })]).await;
    assert_eq!(decorations(&backend, &uri).await, pairs(&[("greeting", "Hallo")]));

    fs::remove_file(&german).unwrap();
    backend
        .did_change_watched_files(DidChangeWatchedFilesParams {
            changes: vec![FileEvent { uri: german_uri, typ: FileChangeType::DELETED }],
        })
        .await;

    let value = execute(&backend, "thymeleaf-i18n.getLocales", Vec::new()).await.unwrap();
    assert_eq!(value["active"], json!("D"));
    assert_eq!(decorations(&backend, &uri).await, pairs(&[("greeting", "Hello"), ("bye", "Bye")]));
}

#[tokio::test]
async fn test_inlay_hints_and_code_actions() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;

    let hints = backend
        .inlay_hint(InlayHintParams {
            work_done_progress_params: WorkDoneProgressParams::default(),
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            range: Range::new(Position::new(1, 0), Position::new(2, 0)),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hints.len(), 1);
    assert_eq!(hints[0].position, Position::new(1, 12));

    let actions = backend
        .code_action(CodeActionParams {
            text_document: TextDocumentIdentifier { uri },
            range: Range::new(Position::new(0, 27), Position::new(0, 28)),
            context: CodeActionContext::default(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(actions.len(), 1);
    let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
        panic!("expected a code action");
    };
    assert_eq!(action.title, "Externalize text to resource file");
    assert_eq!(action.kind, Some(CodeActionKind::REFACTOR_EXTRACT));
}

#[tokio::test(start_paused = true)]
async fn test_selection_hides_token_under_cursor_after_debounce() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;

    backend
        .did_change_selection(SelectionParams { uri: uri.clone(), position: Position::new(0, 15) })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The debounced pass already pushed the overlay without `greeting`.
    assert!(!backend.render_overlay().await);
    assert_eq!(decorations(&backend, &uri).await, pairs(&[("bye", "Bye")]));

    backend
        .did_change_selection(SelectionParams { uri: uri.clone(), position: Position::new(3, 0) })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!backend.render_overlay().await);
    assert_eq!(decorations(&backend, &uri).await, pairs(&[("greeting", "Hello"), ("bye", "Bye")]));
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_overlay_is_pushed_once() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;

    assert!(!backend.render_overlay().await);

    replace_text(&backend, &uri, 2, "<p>#{bye}</p>\n").await;
    assert!(backend.render_overlay().await);
    assert!(!backend.render_overlay().await);

    replace_text(&backend, &uri, 3, "<p>#{bye}</p>\n<p>plain</p>\n").await;
    assert!(!backend.render_overlay().await);
}

#[tokio::test]
async fn test_quick_edit_extracts_text_into_default_resource_file() {
    let workspace = sample_workspace();
    let (backend, uri) = start_server(&workspace).await;
    let prompter = AcceptingPrompter::default();

    backend
        .run_quick_edit_with(&prompter, &uri, Range::new(Position::new(3, 3), Position::new(3, 14)))
        .await;

    assert_eq!(
        prompter.shown(),
        vec![
            "input:Enter a variable name:hello_world".to_string(),
            "info:Properties file updated".to_string(),
        ]
    );
    assert_eq!(
        fs::read_to_string(workspace.path().join("i18n/messages.properties")).unwrap(),
        "greeting=Hello\nbye=Bye\nhello_world=Hello World\n"
    );

    // The client applies the edit and sends the new text back.
    let page = fs::read_to_string(workspace.path().join("templates/page.html")).unwrap();
    let edited = page.replace("<p>Hello World</p>", "<p th:text=\"#{hello_world}\">Hello World</p>");
    replace_text(&backend, &uri, 2, &edited).await;

    assert_eq!(
        decorations(&backend, &uri).await,
        pairs(&[("greeting", "Hello"), ("bye", "Bye"), ("hello_world", "Hello World")])
    );
}

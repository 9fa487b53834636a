//! Execute Command ハンドラー
//!
//! `workspace/executeCommand` リクエストを処理し、
//! カスタムコマンドを実行します。

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    ExecuteCommandParams,
    Range,
    Url,
};

use super::super::backend::Backend;

pub const PROCESS_SELECTION: &str = "thymeleaf-i18n.processSelection";
pub const SHOW_LOCALE_OPTIONS: &str = "thymeleaf-i18n.showLocaleOptions";
pub const SET_LOCALE: &str = "thymeleaf-i18n.setLocale";
pub const GET_LOCALES: &str = "thymeleaf-i18n.getLocales";
pub const GET_DECORATIONS: &str = "thymeleaf-i18n.getDecorations";

/// Commands advertised in the server capabilities.
pub const COMMANDS: &[&str] =
    &[PROCESS_SELECTION, SHOW_LOCALE_OPTIONS, SET_LOCALE, GET_LOCALES, GET_DECORATIONS];

/// `thymeleaf-i18n.processSelection` の引数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSelectionArgs {
    pub uri: Url,
    pub range: Range,
}

/// `thymeleaf-i18n.setLocale` の引数
#[derive(Debug, Deserialize)]
struct SetLocaleArgs {
    /// 切り替え先のロケールタグ
    locale: String,
}

/// `thymeleaf-i18n.getDecorations` の引数
#[derive(Debug, Deserialize)]
struct GetDecorationsArgs {
    /// ファイル URI
    uri: Url,
}

#[derive(Debug, Serialize)]
struct LocaleItem {
    tag: String,
    label: String,
}

#[derive(Debug, Serialize)]
struct LocalesResponse {
    active: String,
    locales: Vec<LocaleItem>,
}

/// `workspace/executeCommand` リクエストを処理
pub async fn handle_execute_command(
    backend: &Backend,
    params: ExecuteCommandParams,
) -> Result<Option<Value>> {
    tracing::debug!(command = %params.command, "Execute Command request");

    match params.command.as_str() {
        PROCESS_SELECTION => handle_process_selection(backend, &params.arguments).await,
        SHOW_LOCALE_OPTIONS => {
            backend.show_locale_options().await;
            Ok(None)
        }
        SET_LOCALE => handle_set_locale(backend, &params.arguments).await,
        GET_LOCALES => handle_get_locales(backend).await,
        GET_DECORATIONS => handle_get_decorations(backend, &params.arguments).await,
        _ => {
            tracing::warn!("Unknown command: {}", params.command);
            Ok(None)
        }
    }
}

/// 最初の引数をパースする。失敗したら警告を出して `None`
fn parse_first_argument<T: for<'de> Deserialize<'de>>(
    command: &str,
    arguments: &[Value],
) -> Option<T> {
    let Some(first) = arguments.first().cloned() else {
        tracing::warn!("Missing arguments for {}", command);
        return None;
    };
    match serde_json::from_value(first) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Invalid arguments for {}: {}", command, e);
            None
        }
    }
}

async fn handle_process_selection(backend: &Backend, arguments: &[Value]) -> Result<Option<Value>> {
    let Some(args) = parse_first_argument::<ProcessSelectionArgs>(PROCESS_SELECTION, arguments)
    else {
        return Ok(None);
    };

    backend.run_quick_edit(&args.uri, args.range).await;
    Ok(None)
}

async fn handle_set_locale(backend: &Backend, arguments: &[Value]) -> Result<Option<Value>> {
    let Some(args) = parse_first_argument::<SetLocaleArgs>(SET_LOCALE, arguments) else {
        return Ok(Some(Value::Bool(false)));
    };

    let changed = backend.set_locale(&args.locale).await;
    Ok(Some(Value::Bool(changed)))
}

/// `{ active, locales: [{ tag, label }] }` を返す。予約済みのロケールを含む
async fn handle_get_locales(backend: &Backend) -> Result<Option<Value>> {
    let response = {
        let registry = backend.state.registry.lock().await;
        let locales = registry
            .picker_items()
            .into_iter()
            .map(|entry| LocaleItem { label: registry.label(&entry.tag), tag: entry.tag })
            .collect();
        LocalesResponse { active: registry.active().to_string(), locales }
    };

    Ok(serde_json::to_value(response).ok())
}

/// ドキュメントの注釈一覧を返す。ロケールが `Off` なら空
async fn handle_get_decorations(backend: &Backend, arguments: &[Value]) -> Result<Option<Value>> {
    let Some(args) = parse_first_argument::<GetDecorationsArgs>(GET_DECORATIONS, arguments) else {
        return Ok(Some(serde_json::json!([])));
    };

    let annotations = backend.annotations_for(&args.uri).await;
    tracing::debug!(uri = %args.uri, count = annotations.len(), "Executing getDecorations");

    Ok(Some(serde_json::to_value(annotations).unwrap_or_else(|_| serde_json::json!([]))))
}

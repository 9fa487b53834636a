//! Entry point for the Language Server Protocol implementation.

use thymeleaf_i18n_language_server::Backend;
use thymeleaf_i18n_language_server::ide::protocol::{
    DID_CHANGE_ACTIVE_EDITOR,
    DID_CHANGE_SELECTION,
    DID_CHANGE_VISIBLE_RANGES,
};
use tower_lsp::{
    LspService,
    Server,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

/// Directory for daily rolling log files; stderr only when unset.
const LOG_DIR_ENV: &str = "THYMELEAF_I18N_LOG_DIR";

/// stdout is the LSP channel, so logs go to stderr and optionally to a file.
fn init_tracing() -> Vec<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_layer = fmt::layer().with_target(true).with_ansi(false).with_writer(stderr_writer);

    let mut guards = vec![stderr_guard];
    let file_layer = std::env::var_os(LOG_DIR_ENV).map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, "thymeleaf-i18n.log");
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_writer)
    });

    tracing_subscriber::registry().with(env_filter).with(stderr_layer).with(file_layer).init();
    guards
}

#[tokio::main]
async fn main() {
    let _tracing_guards = init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting thymeleaf-i18n-language-server");

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::build(Backend::new)
        .custom_method(DID_CHANGE_SELECTION, Backend::did_change_selection)
        .custom_method(DID_CHANGE_VISIBLE_RANGES, Backend::did_change_visible_ranges)
        .custom_method(DID_CHANGE_ACTIVE_EDITOR, Backend::did_change_active_editor)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}

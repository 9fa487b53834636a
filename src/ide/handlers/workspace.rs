//! Workspace-related handlers.

use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeWatchedFilesParams,
    DidChangeWorkspaceFoldersParams,
    FileChangeType,
    MessageType,
};

use super::super::backend::Backend;
use crate::config::settings_from_client;

pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    tracing::info!(settings = %params.settings, "didChangeConfiguration received");

    let new_settings = match settings_from_client(params.settings) {
        Ok(new_settings) => new_settings,
        Err(error) => {
            tracing::warn!(%error, "Ignoring unreadable configuration");
            return;
        }
    };

    let mut config_manager = backend.config_manager.lock().await;
    let rescan = config_manager.scan_inputs_differ(&new_settings);
    let state_file_changed = config_manager.get_settings().state_file != new_settings.state_file;

    match config_manager.update_settings(new_settings) {
        Ok(()) => {
            drop(config_manager);
            tracing::info!(rescan, "configuration updated successfully");
            backend.after_settings_change(rescan, state_file_changed).await;
        }
        Err(error) => {
            drop(config_manager);
            tracing::error!(%error, "configuration validation error");
            backend
                .client
                .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
                .await;
        }
    }
}

pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    let mut resources_changed = false;

    for change in params.changes {
        let Some(file_path) = Backend::uri_to_path(&change.uri) else {
            continue;
        };

        if Backend::is_config_file(&file_path) {
            tracing::debug!("Config file changed: {:?}", file_path);
            backend.reload_config_file().await;
            continue;
        }

        if !backend.is_resource_file(&file_path).await {
            continue;
        }
        tracing::debug!("Resource file changed: {:?}, type: {:?}", file_path, change.typ);

        match change.typ {
            FileChangeType::CREATED | FileChangeType::CHANGED => {
                backend.reload_resource_file(&file_path).await;
                resources_changed = true;
            }
            FileChangeType::DELETED => {
                backend.remove_resource_file(&file_path).await;
                resources_changed = true;
            }
            _ => {}
        }
    }

    if resources_changed {
        backend.render_overlay().await;
    }
}

/// 先頭のワークスペースフォルダが変わったら設定を読み直して再走査する
pub async fn handle_did_change_workspace_folders(
    backend: &Backend,
    _: DidChangeWorkspaceFoldersParams,
) {
    let Ok(folders) = backend.get_workspace_folders().await else {
        tracing::warn!("Failed to fetch workspace folders");
        return;
    };
    let new_root = folders.first().and_then(|folder| Backend::uri_to_path(&folder.uri));

    let mut config_manager = backend.config_manager.lock().await;
    if config_manager.workspace_root() == new_root.as_ref() {
        return;
    }
    tracing::info!(?new_root, "Workspace root changed");
    let result = config_manager.load_settings(new_root);
    drop(config_manager);

    if let Err(error) = result {
        backend
            .client
            .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
            .await;
    }
    backend.after_settings_change(true, true).await;
}

//! 設定管理を行うモジュール

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    I18nSettings,
    ServerSettings,
    loader,
};

/// Key under which clients namespace the settings.
const SETTINGS_SECTION: &str = "thymeleafI18n";

/// 現在の設定とワークスペースルートを保持する
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    current_settings: I18nSettings,
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: I18nSettings::default(), workspace_root: None }
    }

    /// ワークスペースの設定ファイルを読み込み、検証して保持する
    ///
    /// 設定ファイルがなければデフォルト値を使う。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!(?workspace_root, "Loading settings");

        let settings = match &workspace_root {
            Some(root) => loader::load_from_workspace(root)?.unwrap_or_default(),
            None => I18nSettings::default(),
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.workspace_root = workspace_root;
        tracing::debug!(settings = ?self.current_settings, "Settings loaded");

        Ok(())
    }

    /// `workspace/didChangeConfiguration` で受け取った設定に置き換える
    ///
    /// # Errors
    /// バリデーションエラー。その場合、現在の設定は変更されない。
    pub fn update_settings(&mut self, new_settings: I18nSettings) -> Result<(), ConfigError> {
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!(settings = ?self.current_settings, "Settings updated");

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &I18nSettings {
        &self.current_settings
    }

    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }

    /// Folder the resource files are scanned from.
    ///
    /// A relative `folder` is resolved against the workspace root. Returns
    /// `None` when the folder does not exist or there is nowhere to resolve
    /// it from.
    #[must_use]
    pub fn resource_root(&self) -> Option<PathBuf> {
        let root = match (&self.current_settings.folder, &self.workspace_root) {
            (Some(folder), workspace_root) => {
                let folder = Path::new(folder);
                if folder.is_absolute() {
                    folder.to_path_buf()
                } else {
                    workspace_root.as_ref()?.join(folder)
                }
            }
            (None, Some(workspace_root)) => workspace_root.clone(),
            (None, None) => return None,
        };

        if root.is_dir() {
            Some(root)
        } else {
            tracing::warn!(root = %root.display(), "Resource folder does not exist");
            None
        }
    }

    /// Location of the persisted workspace state.
    #[must_use]
    pub fn state_file_path(&self) -> Option<PathBuf> {
        let state_file = Path::new(&self.current_settings.state_file);
        if state_file.is_absolute() {
            return Some(state_file.to_path_buf());
        }
        self.workspace_root.as_ref().map(|root| root.join(state_file))
    }

    /// Returns true when switching to `other` requires a full rescan.
    #[must_use]
    pub fn scan_inputs_differ(&self, other: &I18nSettings) -> bool {
        let current = &self.current_settings;
        current.folder != other.folder
            || current.exclude != other.exclude
            || current.files_exclude != other.files_exclude
            || current.resource_suffix != other.resource_suffix
    }
}

/// Parses the payload of `workspace/didChangeConfiguration`.
///
/// Accepts the settings object itself or one wrapped as `{ "thymeleafI18n": { ... } }`.
///
/// # Errors
/// Returns [`ConfigError::ParseError`] if the payload does not describe settings.
pub fn settings_from_client(value: serde_json::Value) -> Result<I18nSettings, ConfigError> {
    let wrapped = value.as_object().is_some_and(|object| object.contains_key(SETTINGS_SECTION));
    if wrapped {
        let server_settings: ServerSettings = serde_json::from_value(value)?;
        Ok(server_settings.thymeleaf_i18n)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

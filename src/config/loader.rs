//! Reads the workspace configuration file.

use std::io::ErrorKind;
use std::path::Path;

use super::{
    ConfigError,
    I18nSettings,
};

/// Name of the configuration file looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = ".thymeleaf-i18n.json";

/// ワークスペースのルートから `.thymeleaf-i18n.json` を読み込む
///
/// # Returns
/// - `Ok(Some(settings))`: ファイルが見つかり、パースに成功
/// - `Ok(None)`: ファイルが存在しない
///
/// # Errors
/// - ファイル読み込みエラー (存在しない場合を除く)
/// - JSON パースエラー
pub(super) fn load_from_workspace(
    workspace_root: &Path,
) -> Result<Option<I18nSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "No configuration file");
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };

    tracing::debug!(path = %config_path.display(), "Loading configuration file");
    let settings: I18nSettings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn reads_settings_from_config_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{"resourceSuffix": ".msg", "exclude": ["_old"]}"#,
        )
        .unwrap();

        let settings = load_from_workspace(temp_dir.path()).unwrap().unwrap();

        assert_that!(settings.resource_suffix, eq(".msg"));
        assert_that!(settings.exclude, elements_are![eq("_old")]);
    }

    #[rstest]
    fn missing_config_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_from_workspace(temp_dir.path());

        assert!(matches!(result, Ok(None)));
    }

    #[rstest]
    fn invalid_json_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();

        let result = load_from_workspace(temp_dir.path());

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}

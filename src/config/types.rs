use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "exclude[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Settings as sent by clients that namespace them under the extension name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub thymeleaf_i18n: I18nSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct I18nSettings {
    /// Root folder of the resource files, relative to the workspace root or absolute.
    /// Unset means the workspace root.
    pub folder: Option<String>,

    /// Regular expressions matched against file names and full paths.
    pub exclude: Vec<String>,

    /// Generic glob exclusions (`pattern -> enabled`), applied to directories and files.
    pub files_exclude: BTreeMap<String, bool>,

    pub resource_suffix: String,

    pub overlay: OverlayConfig,

    pub indexing: IndexingConfig,

    /// Where the selected locale is persisted, relative to the workspace root or absolute.
    pub state_file: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// Quiet period before a burst of edits, cursor moves or scrolls re-renders the overlay.
    pub debounce_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexingConfig {
    /// Concurrent resource file reads during a scan.
    /// Default: 80% of CPU cores (minimum 1).
    pub num_threads: Option<usize>,
}

impl IndexingConfig {
    #[must_use]
    pub fn effective_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| (num_cpus::get() * 4 / 5).max(1))
    }
}

impl I18nSettings {
    /// Glob patterns of `files_exclude` that are switched on.
    pub fn enabled_files_exclude(&self) -> impl Iterator<Item = &str> {
        self.files_exclude
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(pattern, _)| pattern.as_str())
    }

    /// # Errors
    /// - Invalid regular expression in `exclude`
    /// - Invalid glob pattern in `filesExclude`
    /// - Empty suffix or state file
    /// - Zero indexing threads
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (index, pattern) in self.exclude.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::new(
                    format!("exclude[{index}]"),
                    format!("Invalid regular expression '{pattern}': {e}"),
                ));
            }
        }

        for pattern in self.files_exclude.keys() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("filesExclude[\"{pattern}\"]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if self.resource_suffix.is_empty() {
            errors.push(ValidationError::new(
                "resourceSuffix",
                "The suffix cannot be empty. Example: \".properties\"",
            ));
        }

        if self.state_file.trim().is_empty() {
            errors.push(ValidationError::new(
                "stateFile",
                "The path cannot be empty. Example: \".thymeleaf-i18n/state.json\"",
            ));
        }

        if self.indexing.num_threads == Some(0) {
            errors.push(ValidationError::new(
                "indexing.numThreads",
                "At least one thread is required. Remove the field to use the default",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for I18nSettings {
    fn default() -> Self {
        let files_exclude = [
            "**/.git",
            "**/.svn",
            "**/.hg",
            "**/CVS",
            "**/.DS_Store",
            "**/Thumbs.db",
            "**/node_modules",
            "**/target",
        ]
        .into_iter()
        .map(|pattern| (pattern.to_string(), true))
        .collect();

        Self {
            folder: None,
            exclude: Vec::new(),
            files_exclude,
            resource_suffix: ".properties".to_string(),
            overlay: OverlayConfig::default(),
            indexing: IndexingConfig::default(),
            state_file: ".thymeleaf-i18n/state.json".to_string(),
        }
    }
}

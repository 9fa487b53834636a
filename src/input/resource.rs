//! Resource file (message bundle) input definitions.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use crate::input::properties::{
    parse_properties,
    upsert_entry,
};

/// Locale tag used for base files (no `_locale` suffix) in comparisons.
pub const DEFAULT_LOCALE: &str = "D";

/// Pseudo locale that disables the overlay.
pub const OFF_LOCALE: &str = "Off";

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to read resource file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write resource file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Derives the locale tag from a resource file name.
///
/// The tag is the second `_`-separated segment with its extension removed;
/// a name without `_` belongs to the base locale and yields an empty tag.
///
/// # Examples
/// ```
/// use thymeleaf_i18n_language_server::input::resource::derive_locale_tag;
///
/// assert_eq!(derive_locale_tag("messages_fr.properties"), "fr");
/// assert_eq!(derive_locale_tag("messages.properties"), "");
/// ```
#[must_use]
pub fn derive_locale_tag(file_name: &str) -> String {
    file_name
        .split('_')
        .nth(1)
        .and_then(|segment| segment.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Maps an empty (base) locale tag to [`DEFAULT_LOCALE`].
#[must_use]
pub fn locale_for_check(tag: &str) -> &str {
    if tag.is_empty() { DEFAULT_LOCALE } else { tag }
}

/// Parsed key/value table of one resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    path: PathBuf,
    /// Empty for the base locale.
    locale_tag: String,
    entries: HashMap<String, String>,
}

impl ResourceFile {
    #[must_use]
    pub fn new(path: PathBuf, entries: HashMap<String, String>) -> Self {
        let locale_tag = path
            .file_name()
            .map(|name| derive_locale_tag(&name.to_string_lossy()))
            .unwrap_or_default();
        Self { path, locale_tag, entries }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw locale tag, empty for the base locale.
    #[must_use]
    pub fn locale_tag(&self) -> &str {
        &self.locale_tag
    }

    /// Locale tag normalized for comparison (`""` becomes `"D"`).
    #[must_use]
    pub fn locale(&self) -> &str {
        locale_for_check(&self.locale_tag)
    }

    #[must_use]
    pub const fn entries(&self) -> &HashMap<String, String> {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }
}

/// Reads and parses a resource file.
///
/// # Errors
/// Returns [`ResourceError::Read`] if the file cannot be read as UTF-8 text.
pub async fn load_resource_file(path: &Path) -> Result<ResourceFile, ResourceError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResourceError::Read { path: path.display().to_string(), source })?;

    Ok(ResourceFile::new(path.to_path_buf(), parse_properties(&content)))
}

/// Writes `key=value` into the resource file at `path`, creating it if missing.
///
/// # Errors
/// Returns an error if the existing file cannot be read or the result cannot be written.
pub async fn write_entry(path: &Path, key: &str, value: &str) -> Result<(), ResourceError> {
    let current = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ResourceError::Read { path: path.display().to_string(), source });
        }
    };

    let updated = upsert_entry(&current, key, value);

    tokio::fs::write(path, updated)
        .await
        .map_err(|source| ResourceError::Write { path: path.display().to_string(), source })?;

    tracing::debug!(path = %path.display(), key, "Resource entry written");
    Ok(())
}

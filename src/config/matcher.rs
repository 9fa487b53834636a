//! Decides which files under the resource root are resource files.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};
use regex::Regex;

use super::I18nSettings;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid files exclude pattern '{pattern}': {source}")]
    InvalidFilesExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Matches paths against the resource root, `exclude` regexes and `filesExclude` globs.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    resource_root: PathBuf,
    resource_suffix: String,
    exclude: Vec<Regex>,
    files_exclude: GlobSet,
}

impl FileMatcher {
    /// Creates a new matcher from settings.
    ///
    /// # Errors
    /// Returns an error for an invalid regex or glob pattern.
    pub fn new(resource_root: PathBuf, settings: &I18nSettings) -> Result<Self, MatcherError> {
        let exclude = settings
            .exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| MatcherError::InvalidExcludePattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = GlobSetBuilder::new();
        for pattern in settings.enabled_files_exclude() {
            let glob = Glob::new(pattern).map_err(|source| {
                MatcherError::InvalidFilesExcludePattern { pattern: pattern.to_string(), source }
            })?;
            builder.add(glob);
        }

        Ok(Self {
            resource_root,
            resource_suffix: settings.resource_suffix.clone(),
            exclude,
            files_exclude: builder.build()?,
        })
    }

    #[must_use]
    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    #[must_use]
    pub fn resource_suffix(&self) -> &str {
        &self.resource_suffix
    }

    /// Returns true if a directory (relative to the resource root) must not be descended.
    #[must_use]
    pub fn is_pruned_dir_relative(&self, relative_path: &Path) -> bool {
        self.files_exclude.is_match(relative_path)
    }

    /// Returns true if the file lies outside the resource root, or its name
    /// or full path matches an `exclude` regex, or it sits in a
    /// `filesExclude` directory.
    #[must_use]
    pub fn is_excluded(&self, absolute_path: &Path) -> bool {
        let Ok(relative_path) = absolute_path.strip_prefix(&self.resource_root) else {
            return true;
        };

        let full_path = absolute_path.to_string_lossy();
        let file_name = absolute_path.file_name().map(|name| name.to_string_lossy());
        let regex_hit = self.exclude.iter().any(|regex| {
            regex.is_match(&full_path) || file_name.as_deref().is_some_and(|n| regex.is_match(n))
        });
        if regex_hit {
            return true;
        }

        relative_path
            .ancestors()
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .any(|ancestor| self.files_exclude.is_match(ancestor))
    }

    /// Returns true if the path carries the resource suffix and is not excluded.
    #[must_use]
    pub fn is_resource_file(&self, absolute_path: &Path) -> bool {
        let has_suffix = absolute_path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(&self.resource_suffix));

        has_suffix && !self.is_excluded(absolute_path)
    }
}

//! Full scans of the resource root.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

use futures::stream::{
    self,
    StreamExt,
};
use ignore::WalkBuilder;

use crate::config::FileMatcher;
use crate::indexer::store::ResourceIndex;
use crate::indexer::types::{
    IndexerError,
    ScanOutcome,
};
use crate::input::resource::load_resource_file;

/// Builds fresh [`ResourceIndex`]es from the file system.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceIndexer {
    generation: Arc<AtomicU64>,
}

impl WorkspaceIndexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no scan was started after `generation`.
    #[must_use]
    pub fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// リソースルート以下を走査して新しいインデックスを作る
    ///
    /// 読み込めないファイルは警告を出してスキップする。
    ///
    /// # Errors
    /// - リソースルートがディレクトリでない
    /// - 走査タスクの join に失敗
    pub async fn scan(
        &self,
        matcher: &FileMatcher,
        num_threads: usize,
    ) -> Result<ScanOutcome, IndexerError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let root = matcher.resource_root().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidRoot(root.display().to_string()));
        }

        tracing::debug!(root = %root.display(), generation, "Scanning resource files");

        let walk_matcher = matcher.clone();
        let paths =
            tokio::task::spawn_blocking(move || Self::find_resource_files(&walk_matcher)).await?;

        // 並列に読み込み、順序は BTreeMap 側で決まる
        let results: Vec<_> = stream::iter(paths)
            .map(|path| async move {
                let result = load_resource_file(&path).await;
                (result, path)
            })
            .buffer_unordered(num_threads.max(1))
            .collect()
            .await;

        let mut index = ResourceIndex::new();
        let mut skipped = 0;
        for (result, path) in results {
            match result {
                Ok(file) => {
                    index.insert(file);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping resource file");
                    skipped += 1;
                }
            }
        }

        tracing::info!(files = index.len(), skipped, "Resource scan finished");
        Ok(ScanOutcome { generation, index, skipped })
    }

    fn find_resource_files(matcher: &FileMatcher) -> Vec<PathBuf> {
        let root = matcher.resource_root().to_path_buf();
        let prune_matcher = matcher.clone();
        let prune_root = root.clone();

        let mut found_files = Vec::new();
        for result in WalkBuilder::new(&root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let Ok(relative) = entry.path().strip_prefix(&prune_root) else {
                    return true;
                };
                relative.as_os_str().is_empty() || !prune_matcher.is_pruned_dir_relative(relative)
            })
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if matcher.is_resource_file(path) {
                found_files.push(path.to_path_buf());
            }
        }

        found_files
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;
    use std::path::Path;

    use googletest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::config::I18nSettings;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn matcher(root: &Path, settings: &I18nSettings) -> FileMatcher {
        FileMatcher::new(root.to_path_buf(), settings).unwrap()
    }

    #[tokio::test]
    async fn scan_collects_resource_files_and_locales() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "messages.properties", "greeting=Hello\n");
        write(temp_dir.path(), "admin/messages_fr.properties", "greeting=Bonjour\n");
        write(temp_dir.path(), "notes.txt", "greeting=ignored\n");

        let indexer = WorkspaceIndexer::new();
        let outcome =
            indexer.scan(&matcher(temp_dir.path(), &I18nSettings::default()), 2).await.unwrap();

        assert_eq!(outcome.index.len(), 2);
        assert_eq!(outcome.index.lookup("greeting", "fr"), Some("Bonjour"));
        assert_eq!(outcome.skipped, 0);
        assert!(indexer.is_latest(outcome.generation));
    }

    #[googletest::test]
    #[tokio::test]
    async fn scan_skips_excluded_files_and_pruned_directories() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "messages.properties", "a=1\n");
        write(temp_dir.path(), "messages_old.properties", "a=2\n");
        write(temp_dir.path(), "node_modules/lib/messages_de.properties", "a=3\n");

        let settings =
            I18nSettings { exclude: vec!["_old".to_string()], ..I18nSettings::default() };
        let outcome =
            WorkspaceIndexer::new().scan(&matcher(temp_dir.path(), &settings), 1).await.unwrap();

        let tags: Vec<String> = outcome.index.locale_tags().into_iter().collect();
        expect_that!(outcome.index.len(), eq(1));
        expect_that!(tags, is_empty());
    }

    #[tokio::test]
    async fn scan_skips_unreadable_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "messages.properties", "a=1\n");
        fs::write(temp_dir.path().join("broken_fr.properties"), [0xff, 0xfe, 0x00]).unwrap();

        let outcome = WorkspaceIndexer::new()
            .scan(&matcher(temp_dir.path(), &I18nSettings::default()), 4)
            .await
            .unwrap();

        assert_eq!(outcome.index.len(), 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn scan_of_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result =
            WorkspaceIndexer::new().scan(&matcher(&missing, &I18nSettings::default()), 1).await;

        assert!(matches!(result, Err(IndexerError::InvalidRoot(_))));
    }

    #[tokio::test]
    async fn newer_scan_supersedes_older_generation() {
        let temp_dir = TempDir::new().unwrap();
        let indexer = WorkspaceIndexer::new();
        let matcher = matcher(temp_dir.path(), &I18nSettings::default());

        let first = indexer.scan(&matcher, 1).await.unwrap();
        let second = indexer.scan(&matcher, 1).await.unwrap();

        assert!(!indexer.is_latest(first.generation));
        assert!(indexer.is_latest(second.generation));
    }
}

//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のヘルパー関数を提供します。
#![cfg(test)]

use std::path::Path;

use crate::db::I18nDatabaseImpl;
use crate::indexer::store::ResourceIndex;
use crate::input::source::SourceFile;

/// `(path, key, value)` の組からインデックスを作成する
pub(crate) fn create_index(entries: &[(&str, &str, &str)]) -> ResourceIndex {
    let mut index = ResourceIndex::new();
    for (path, key, value) in entries {
        index.add_entry(Path::new(path), key, value);
    }
    index
}

/// テスト用の HTML テンプレートを作成する
pub(crate) fn create_source_file(db: &I18nDatabaseImpl, content: &str) -> SourceFile {
    SourceFile::new(db, "file:///templates/page.html".to_string(), content.to_string())
}

//! thymeleaf-i18n-language-server
//!
//! Thymeleaf テンプレートの `#{key}` 参照に翻訳をインライン表示し、
//! 選択テキストをメッセージバンドル（`*.properties`）へ切り出す Language Server Protocol (LSP) 実装

pub mod config;
pub mod db;
pub mod ide;
pub mod indexer;
pub mod input;
pub mod storage;
pub mod syntax;
#[cfg(test)]
mod test_utils;
pub mod types;

// Backend を再エクスポート
pub use ide::backend::Backend;

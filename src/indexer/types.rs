//! Indexer type definitions.

use thiserror::Error;

use crate::indexer::store::ResourceIndex;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// The resource root is missing or not a directory
    #[error("Resource root is not a directory: {0}")]
    InvalidRoot(String),
    /// A scan task could not be joined
    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of one full scan.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Increases with every scan started; older outcomes must not be applied.
    pub generation: u64,
    pub index: ResourceIndex,
    /// Files found but not readable.
    pub skipped: usize,
}

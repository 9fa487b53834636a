//! Resource file discovery and the in-memory resource index.

pub mod store;
pub mod types;
pub mod workspace;

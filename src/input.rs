//! Inputs: open documents and resource files.

pub mod properties;
pub mod resource;
pub mod source;

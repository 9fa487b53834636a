//! IDE features module.

pub mod backend;
pub mod debounce;
mod handlers;
pub mod locale;
pub mod overlay;
pub mod protocol;
pub mod quick_edit;
pub mod state;

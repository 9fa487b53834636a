//! Settings: workspace config file, client overrides, validation and path matching.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Resource file matcher
mod matcher;
/// Configuration types and settings
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::{
    ConfigManager,
    settings_from_client,
};
pub use matcher::{
    FileMatcher,
    MatcherError,
};
pub use types::{
    ConfigError,
    I18nSettings,
    IndexingConfig,
    OverlayConfig,
    ServerSettings,
    ValidationError,
};

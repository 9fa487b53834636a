//! Salsa database definitions.

/// Database trait for the language server queries.
#[salsa::db]
pub trait I18nDatabase: salsa::Database {}

/// Database implementation.
#[salsa::db]
#[derive(Default, Clone)]
pub struct I18nDatabaseImpl {
    /// Salsa storage.
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for I18nDatabaseImpl {}

#[salsa::db]
impl I18nDatabase for I18nDatabaseImpl {}

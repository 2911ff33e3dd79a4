pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use thiserror::Error;

/// Failures of the storage collaborator.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: String, reason: String },
}

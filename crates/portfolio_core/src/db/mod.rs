//! SQLite files backing `SqliteDocumentStore`.
//!
//! # Responsibility
//! - Open the database file the store persists documents in.
//! - Bring the `documents` table to the schema this binary understands.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A returned connection always has a usable `documents` table.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while preparing the document database.
#[derive(Debug)]
pub enum DbError {
    /// The database file could not be opened at all.
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// One schema step failed and was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file claims a schema this binary does not know.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Version matches but the `documents` table is missing or malformed.
    SchemaMismatch(String),
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { target, source } => {
                write!(f, "cannot open document database {target}: {source}")
            }
            Self::Migration { version, source } => {
                write!(f, "document schema step {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "document store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch(detail) => write!(f, "document schema mismatch: {detail}"),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::SchemaMismatch(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

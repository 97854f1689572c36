//! Durable note storage: SQLite connection setup and schema upkeep.
//!
//! # Responsibility
//! - Hand out connections that are fully migrated and configured.
//! - Track the schema revision through `PRAGMA user_version`.
//!
//! # Invariants
//! - No note data is read or written before migrations succeed.
//! - A database written by a newer binary is refused, never half-read.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure opening or preparing the underlying database.
#[derive(Debug)]
pub enum DbError {
    /// The storage engine reported an error.
    Sqlite(rusqlite::Error),
    /// The on-disk schema revision is ahead of what this binary knows.
    SchemaAhead { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaAhead { found, supported } => write!(
                f,
                "schema revision {found} was written by a newer binary (this one supports up to {supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaAhead { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

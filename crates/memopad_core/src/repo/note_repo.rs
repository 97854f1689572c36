//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the durable `notes` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `id` is assigned by the store and unique for the record lifetime.
//! - Every mutation leaves `updated_at >= created_at`; `created_at` is never
//!   rewritten after insert.
//! - Read paths must reject invalid persisted state instead of masking it.

use crate::db::migrations::supported_version;
use crate::db::DbError;
use crate::model::note::{now_epoch_ms, Note, NoteDraft, NoteId, NoteValidationError};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    is_completed,
    created_at,
    updated_at
FROM notes";

const NOTES_TABLE: &str = "notes";
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "title",
    "content",
    "is_completed",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    /// Persists a draft and returns the store-assigned id.
    fn insert_note(&self, draft: &NoteDraft) -> RepoResult<NoteId>;
    /// Replaces title/content/completion of the record matching `note.id`.
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    /// Removes the record; an absent id is a successful no-op.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    /// Point lookup; absent is a normal outcome.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Full listing ordered by `updated_at DESC, id DESC`.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Partial update of exactly the completion flag.
    fn set_completion(&self, id: NoteId, is_completed: bool) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, draft: &NoteDraft) -> RepoResult<NoteId> {
        draft.validate()?;

        let now = now_epoch_ms();
        let created_at = draft.created_at.unwrap_or(now);
        let updated_at = draft.updated_at.unwrap_or_else(|| created_at.max(now));

        self.conn.execute(
            "INSERT INTO notes (title, content, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draft.title.as_str(),
                draft.content.as_str(),
                bool_to_int(draft.is_completed),
                created_at,
                updated_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        // MAX(created_at, ?) keeps updated_at >= created_at even when the
        // wall clock moved backwards between insert and update.
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                content = ?3,
                is_completed = ?4,
                updated_at = MAX(created_at, ?5)
             WHERE id = ?1;",
            params![
                note.id,
                note.title.as_str(),
                note.content.as_str(),
                bool_to_int(note.is_completed),
                now_epoch_ms(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.id));
        }

        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM notes WHERE id = ?1;", params![id])?;
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY updated_at DESC, id DESC;"))?;

        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn set_completion(&self, id: NoteId, is_completed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                is_completed = ?2,
                updated_at = MAX(created_at, ?3)
             WHERE id = ?1;",
            params![id, bool_to_int(is_completed), now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let expected_version = supported_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [NOTES_TABLE],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable(NOTES_TABLE));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(notes);")?;
    let mut rows = stmt.query([])?;
    let mut present = BTreeSet::new();
    while let Some(row) = rows.next()? {
        present.insert(row.get::<_, String>(1)?);
    }
    for &column in REQUIRED_COLUMNS {
        if !present.contains(column) {
            return Err(RepoError::MissingRequiredColumn {
                table: NOTES_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let is_completed = match row.get::<_, i64>("is_completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_completed value `{other}` in notes.is_completed"
            )));
        }
    };

    let note = Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        is_completed,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    note.validate()
        .map_err(|err| RepoError::InvalidData(format!("note {}: {err}", note.id)))?;
    Ok(note)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

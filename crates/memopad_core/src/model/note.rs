//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record persisted by the store.
//! - Provide the draft shape used for inserts before an id exists.
//!
//! # Invariants
//! - `id` is store-assigned and never reused for another note.
//! - `updated_at >= created_at` for every persisted record.
//! - `created_at` is written once and never modified afterwards.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable store-assigned identifier for a note.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = i64;

/// Canonical persisted note record.
///
/// Field names serialize in camelCase to match the shape presentation-layer
/// consumers already expect (`isCompleted`, `createdAt`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Store-assigned id, immutable for the record lifetime.
    pub id: NoteId,
    /// Display title. Non-blank at the controller boundary; storage itself
    /// accepts transient empties.
    pub title: String,
    /// Free-form body text, unbounded.
    pub content: String,
    /// Completion flag, starts `false`.
    pub is_completed: bool,
    /// Unix epoch milliseconds, stamped at insert.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on every successful mutation.
    pub updated_at: i64,
}

/// Insert shape: a note before the store has assigned an id.
///
/// Timestamps are optional; the store stamps the current time when they are
/// absent. Preset values are honored so callers can build deterministic
/// fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub is_completed: bool,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// Structural validation failures for note data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Title is empty or whitespace-only.
    BlankTitle,
    /// `updated_at` precedes `created_at`.
    TimestampOrder { created_at: i64, updated_at: i64 },
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "note title must not be blank"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} precedes created_at {created_at}"
            ),
        }
    }
}

impl Error for NoteValidationError {}

impl NoteDraft {
    /// Creates a draft with default completion state and store-stamped
    /// timestamps.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_completed: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Validates structural invariants prior to persistence.
    ///
    /// Title blankness is intentionally not checked here: the store accepts
    /// transient empty titles, and the controller boundary rejects them.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if let (Some(created_at), Some(updated_at)) = (self.created_at, self.updated_at) {
            if updated_at < created_at {
                return Err(NoteValidationError::TimestampOrder {
                    created_at,
                    updated_at,
                });
            }
        }
        Ok(())
    }
}

impl Note {
    /// Validates structural invariants of a materialized record.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.updated_at < self.created_at {
            return Err(NoteValidationError::TimestampOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Rejects blank titles at the intent boundary.
pub fn validate_title(title: &str) -> Result<(), NoteValidationError> {
    if title.trim().is_empty() {
        return Err(NoteValidationError::BlankTitle);
    }
    Ok(())
}

/// Current wall-clock time in unix epoch milliseconds.
///
/// A clock set before the unix epoch clamps to 0 rather than panicking.
pub fn now_epoch_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(_) => 0,
    }
}

//! Note use-case service.
//!
//! # Responsibility
//! - Re-export store operations under stable domain contracts.
//! - Return the refreshed record after every successful mutation.
//!
//! # Invariants
//! - Every successful mutation leaves `updated_at` refreshed; the stamping
//!   rule is uniform across full updates and completion toggles.
//! - Service APIs never bypass repository persistence contracts.

use crate::model::note::{Note, NoteDraft, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists one draft and returns the stored record.
    pub fn create_note(&self, draft: &NoteDraft) -> Result<Note, NoteServiceError> {
        let id = self.repo.insert_note(draft)?;
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "created note not found in read-back",
            ))
    }

    /// Replaces title/content/completion and returns the refreshed record.
    ///
    /// `updated_at` is refreshed regardless of the value the caller supplied.
    pub fn update_note(&self, note: &Note) -> Result<Note, NoteServiceError> {
        self.repo.update_note(note)?;
        self.repo
            .get_note(note.id)?
            .ok_or(NoteServiceError::InconsistentState(
                "updated note not found in read-back",
            ))
    }

    /// Sets exactly the completion flag and returns the refreshed record.
    pub fn set_completion(
        &self,
        id: NoteId,
        is_completed: bool,
    ) -> Result<Note, NoteServiceError> {
        self.repo.set_completion(id, is_completed)?;
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "toggled note not found in read-back",
            ))
    }

    /// Removes one note; an absent id is a successful no-op.
    pub fn delete_note(&self, id: NoteId) -> Result<(), NoteServiceError> {
        self.repo.delete_note(id)?;
        Ok(())
    }

    /// Gets one note by stable id.
    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    /// Lists all notes ordered by `updated_at DESC, id DESC`.
    pub fn list_notes(&self) -> RepoResult<Vec<Note>> {
        self.repo.list_notes()
    }
}

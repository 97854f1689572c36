//! Note view-state controller.
//!
//! # Responsibility
//! - Translate UI intents into asynchronous store operations.
//! - Publish a refreshed listing snapshot after every successful mutation.
//! - Keep blocking I/O off the caller's thread.
//!
//! # Invariants
//! - Exactly one worker thread owns the connection; commands are processed
//!   strictly in arrival order.
//! - Blank titles are rejected at this boundary and never reach the store.
//! - Asynchronous failures are logged and recorded, never silently dropped.

use crate::listing::hub::{lock_hub, ListingHub, ListingState, ListingSubscription, SharedListingHub};
use crate::model::note::{validate_title, Note, NoteDraft, NoteId, NoteValidationError};
use crate::repo::note_repo::SqliteNoteRepository;
use crate::service::note_service::{NoteService, NoteServiceError};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

const WORKER_THREAD_NAME: &str = "memopad-store";

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors surfaced by controller entry points.
#[derive(Debug)]
pub enum ControllerError {
    /// Intent rejected at the boundary before dispatch.
    Validation(NoteValidationError),
    /// Failure reported back from the store worker.
    Service(NoteServiceError),
    /// Worker thread could not be started.
    Spawn(std::io::Error),
    /// Worker thread is no longer running.
    WorkerGone,
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Spawn(err) => write!(f, "failed to start store worker: {err}"),
            Self::WorkerGone => write!(f, "store worker is no longer running"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Spawn(err) => Some(err),
            Self::WorkerGone => None,
        }
    }
}

impl From<NoteValidationError> for ControllerError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NoteServiceError> for ControllerError {
    fn from(value: NoteServiceError) -> Self {
        Self::Service(value)
    }
}

enum Command {
    Add {
        title: String,
        content: String,
    },
    Edit {
        id: NoteId,
        title: String,
        content: String,
    },
    ToggleCompletion {
        id: NoteId,
    },
    Remove {
        id: NoteId,
    },
    LoadById {
        id: NoteId,
        reply: Sender<Result<Option<Note>, NoteServiceError>>,
    },
    Shutdown,
}

/// Controller handle owned by the presentation layer.
///
/// Construction takes ownership of an already-opened connection (dependency
/// injection; there is no global store handle). Dropping the handle shuts the
/// worker down and joins it.
#[derive(Debug)]
pub struct NoteController {
    commands: Sender<Command>,
    hub: SharedListingHub,
    last_error: Arc<Mutex<Option<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl NoteController {
    /// Starts the store worker on a migrated connection.
    ///
    /// Fails fast when the connection is not ready for note storage.
    pub fn spawn(conn: Connection) -> ControllerResult<Self> {
        SqliteNoteRepository::try_new(&conn)
            .map_err(NoteServiceError::from)
            .map_err(ControllerError::Service)?;

        let (commands, command_rx) = unbounded();
        let hub: SharedListingHub = Arc::new(Mutex::new(ListingHub::new()));
        let last_error = Arc::new(Mutex::new(None));

        let worker_hub = Arc::clone(&hub);
        let worker_last_error = Arc::clone(&last_error);
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(conn, command_rx, worker_hub, worker_last_error))
            .map_err(ControllerError::Spawn)?;

        Ok(Self {
            commands,
            hub,
            last_error,
            worker: Some(worker),
        })
    }

    /// Subscribes to the observable listing.
    ///
    /// The subscription immediately receives the current snapshot, then every
    /// snapshot published after a successful mutation, until it is dropped.
    pub fn observe_all(&self) -> ListingSubscription {
        ListingSubscription::register(Arc::clone(&self.hub))
    }

    /// Dispatches an insert intent. Blank titles are rejected synchronously.
    pub fn add(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> ControllerResult<()> {
        let title = title.into();
        validate_title(&title)?;
        self.dispatch(Command::Add {
            title,
            content: content.into(),
        })
    }

    /// Dispatches a full edit intent.
    ///
    /// The stored completion flag is preserved; editing never resets it.
    pub fn edit(
        &self,
        id: NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> ControllerResult<()> {
        let title = title.into();
        validate_title(&title)?;
        self.dispatch(Command::Edit {
            id,
            title,
            content: content.into(),
        })
    }

    /// Dispatches a completion-flag flip for one note.
    pub fn toggle_completion(&self, id: NoteId) -> ControllerResult<()> {
        self.dispatch(Command::ToggleCompletion { id })
    }

    /// Dispatches a delete intent. An absent id is a no-op in the store.
    pub fn remove(&self, id: NoteId) -> ControllerResult<()> {
        self.dispatch(Command::Remove { id })
    }

    /// Loads one note through the worker; awaited by edit-form callers.
    ///
    /// An absent id is a normal `Ok(None)` outcome.
    pub fn load_by_id(&self, id: NoteId) -> ControllerResult<Option<Note>> {
        let (reply, reply_rx) = bounded(1);
        self.dispatch(Command::LoadById { id, reply })?;
        match reply_rx.recv() {
            Ok(result) => result.map_err(ControllerError::Service),
            Err(_) => Err(ControllerError::WorkerGone),
        }
    }

    /// Returns the most recent asynchronous failure, when any occurred.
    ///
    /// The value is sticky: it reflects the last failed dispatch, not the
    /// last dispatch overall.
    pub fn last_error(&self) -> Option<String> {
        match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drains pending commands and joins the worker.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn dispatch(&self, command: Command) -> ControllerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ControllerError::WorkerGone)
    }

    fn shutdown_inner(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = worker.join();
        }
    }
}

impl Drop for NoteController {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn run_worker(
    conn: Connection,
    commands: Receiver<Command>,
    hub: SharedListingHub,
    last_error: Arc<Mutex<Option<String>>>,
) {
    info!("event=worker_start module=controller status=ok");
    publish_listing(&conn, &hub, &last_error);

    while let Ok(command) = commands.recv() {
        match command {
            Command::Add { title, content } => {
                run_mutation("note_add", &conn, &hub, &last_error, |service| {
                    let draft = NoteDraft::new(title, content);
                    service.create_note(&draft).map(|note| note.id)
                });
            }
            Command::Edit { id, title, content } => {
                run_mutation("note_edit", &conn, &hub, &last_error, |service| {
                    let existing = service
                        .get_note(id)
                        .map_err(NoteServiceError::from)?
                        .ok_or(NoteServiceError::NoteNotFound(id))?;
                    let updated = Note {
                        id,
                        title,
                        content,
                        is_completed: existing.is_completed,
                        created_at: existing.created_at,
                        updated_at: existing.updated_at,
                    };
                    service.update_note(&updated).map(|note| note.id)
                });
            }
            Command::ToggleCompletion { id } => {
                run_mutation("note_toggle", &conn, &hub, &last_error, |service| {
                    let existing = service
                        .get_note(id)
                        .map_err(NoteServiceError::from)?
                        .ok_or(NoteServiceError::NoteNotFound(id))?;
                    service
                        .set_completion(id, !existing.is_completed)
                        .map(|note| note.id)
                });
            }
            Command::Remove { id } => {
                run_mutation("note_remove", &conn, &hub, &last_error, |service| {
                    service.delete_note(id).map(|()| id)
                });
            }
            Command::LoadById { id, reply } => {
                let result = with_service(&conn, |service| {
                    service.get_note(id).map_err(NoteServiceError::from)
                });
                if let Err(err) = &result {
                    error!("event=note_load module=controller status=error note_id={id} error={err}");
                }
                // Caller may have stopped waiting; nothing to do then.
                let _ = reply.send(result);
            }
            Command::Shutdown => break,
        }
    }

    info!("event=worker_stop module=controller status=ok");
}

fn run_mutation<'conn, F>(
    intent: &str,
    conn: &'conn Connection,
    hub: &SharedListingHub,
    last_error: &Arc<Mutex<Option<String>>>,
    op: F,
) where
    F: FnOnce(&NoteService<SqliteNoteRepository<'conn>>) -> Result<NoteId, NoteServiceError>,
{
    let started_at = Instant::now();
    let result = with_service(conn, op);

    match result {
        Ok(note_id) => {
            info!(
                "event={intent} module=controller status=ok note_id={note_id} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            publish_listing(conn, hub, last_error);
        }
        Err(err) => {
            error!(
                "event={intent} module=controller status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            record_error(last_error, intent, &err);
        }
    }
}

fn with_service<'conn, T, F>(conn: &'conn Connection, op: F) -> Result<T, NoteServiceError>
where
    F: FnOnce(&NoteService<SqliteNoteRepository<'conn>>) -> Result<T, NoteServiceError>,
{
    let repo = SqliteNoteRepository::try_new(conn).map_err(NoteServiceError::from)?;
    op(&NoteService::new(repo))
}

fn publish_listing(
    conn: &Connection,
    hub: &SharedListingHub,
    last_error: &Arc<Mutex<Option<String>>>,
) {
    let result = with_service(conn, |service| {
        service.list_notes().map_err(NoteServiceError::from)
    });

    match result {
        Ok(notes) => lock_hub(hub).publish(ListingState::from_notes(notes)),
        Err(err) => {
            error!("event=listing_refresh module=controller status=error error={err}");
            record_error(last_error, "listing_refresh", &err);
        }
    }
}

fn record_error(
    last_error: &Arc<Mutex<Option<String>>>,
    intent: &str,
    err: &NoteServiceError,
) {
    let message = format!("{intent}: {err}");
    match last_error.lock() {
        Ok(mut guard) => *guard = Some(message),
        Err(poisoned) => *poisoned.into_inner() = Some(message),
    }
}

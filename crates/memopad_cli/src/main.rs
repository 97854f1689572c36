//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `memopad_core` linkage.
//! - Print a deterministic listing summary for quick local sanity checks.

use memopad_core::db::{open_db, open_db_in_memory};
use memopad_core::{core_version, NoteService, SqliteNoteRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("memopad_core version={}", core_version());

    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let conn = match conn {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let repo = match SqliteNoteRepository::try_new(&conn) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("store is not ready: {err}");
            return ExitCode::FAILURE;
        }
    };

    match NoteService::new(repo).list_notes() {
        Ok(notes) => {
            println!("notes={}", notes.len());
            for note in &notes {
                let marker = if note.is_completed { "x" } else { " " };
                println!("[{marker}] {} {}", note.id, note.title);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to list notes: {err}");
            ExitCode::FAILURE
        }
    }
}

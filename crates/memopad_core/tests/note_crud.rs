use memopad_core::db::migrations::supported_version;
use memopad_core::db::{open_db, open_db_in_memory};
use memopad_core::{NoteDraft, NoteRepository, RepoError, SqliteNoteRepository};
use rusqlite::Connection;

fn draft_at(title: &str, content: &str, timestamp: i64) -> NoteDraft {
    let mut draft = NoteDraft::new(title, content);
    draft.created_at = Some(timestamp);
    draft.updated_at = Some(timestamp);
    draft
}

#[test]
fn insert_assigns_fresh_id_and_stamps_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let first_id = repo.insert_note(&NoteDraft::new("first", "body")).unwrap();
    let second_id = repo.insert_note(&NoteDraft::new("second", "body")).unwrap();
    assert_ne!(first_id, second_id);

    let loaded = repo.get_note(first_id).unwrap().unwrap();
    assert_eq!(loaded.id, first_id);
    assert!(loaded.created_at > 0);
    assert!(loaded.updated_at >= loaded.created_at);
}

#[test]
fn deleted_ids_are_never_reassigned() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let first_id = repo.insert_note(&NoteDraft::new("first", "")).unwrap();
    repo.delete_note(first_id).unwrap();

    let second_id = repo.insert_note(&NoteDraft::new("second", "")).unwrap();
    assert_ne!(first_id, second_id);
}

#[test]
fn insert_and_get_roundtrip_preserves_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let mut draft = NoteDraft::new("Buy milk", "2%");
    draft.is_completed = true;
    let id = repo.insert_note(&draft).unwrap();

    let loaded = repo.get_note(id).unwrap().unwrap();
    assert_eq!(loaded.title, "Buy milk");
    assert_eq!(loaded.content, "2%");
    assert!(loaded.is_completed);
}

#[test]
fn insert_honors_preset_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let id = repo.insert_note(&draft_at("fixture", "", 1_000)).unwrap();

    let loaded = repo.get_note(id).unwrap().unwrap();
    assert_eq!(loaded.created_at, 1_000);
    assert_eq!(loaded.updated_at, 1_000);
}

#[test]
fn insert_rejects_inverted_preset_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let mut draft = NoteDraft::new("bad", "");
    draft.created_at = Some(2_000);
    draft.updated_at = Some(1_000);

    let err = repo.insert_note(&draft).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn update_refreshes_updated_at_and_touches_only_target() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let target_id = repo.insert_note(&draft_at("target", "old", 1_000)).unwrap();
    let other_id = repo.insert_note(&draft_at("other", "body", 2_000)).unwrap();

    let mut target = repo.get_note(target_id).unwrap().unwrap();
    target.title = "renamed".to_string();
    target.content = "new".to_string();
    repo.update_note(&target).unwrap();

    let updated = repo.get_note(target_id).unwrap().unwrap();
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.content, "new");
    assert_eq!(updated.created_at, 1_000);
    assert!(updated.updated_at > 1_000);

    let other = repo.get_note(other_id).unwrap().unwrap();
    assert_eq!(other.title, "other");
    assert_eq!(other.updated_at, 2_000);
}

#[test]
fn update_missing_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let id = repo.insert_note(&NoteDraft::new("only", "")).unwrap();
    let mut ghost = repo.get_note(id).unwrap().unwrap();
    ghost.id = id + 100;

    let err = repo.update_note(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id + 100));
}

#[test]
fn delete_missing_id_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let id = repo.insert_note(&draft_at("kept", "body", 1_000)).unwrap();
    repo.delete_note(id + 100).unwrap();

    let listed = repo.list_notes().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].title, "kept");
}

#[test]
fn delete_removes_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let id = repo.insert_note(&NoteDraft::new("gone", "")).unwrap();
    repo.delete_note(id).unwrap();

    assert!(repo.get_note(id).unwrap().is_none());
    assert!(repo.list_notes().unwrap().is_empty());
}

#[test]
fn set_completion_flips_only_flag_and_refreshes_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let id = repo.insert_note(&draft_at("Buy milk", "2%", 1_000)).unwrap();
    repo.set_completion(id, true).unwrap();

    let toggled = repo.get_note(id).unwrap().unwrap();
    assert!(toggled.is_completed);
    assert_eq!(toggled.title, "Buy milk");
    assert_eq!(toggled.content, "2%");
    assert_eq!(toggled.created_at, 1_000);
    assert!(toggled.updated_at > 1_000);
}

#[test]
fn set_completion_missing_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let err = repo.set_completion(42, true).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(42)));
}

#[test]
fn list_orders_by_updated_at_desc_then_id_desc() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();

    let oldest = repo.insert_note(&draft_at("t1", "", 1_000)).unwrap();
    let middle = repo.insert_note(&draft_at("t2", "", 2_000)).unwrap();
    let newest = repo.insert_note(&draft_at("t3", "", 3_000)).unwrap();

    let listed = repo.list_notes().unwrap();
    let ids: Vec<_> = listed.iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![newest, middle, oldest]);

    let tie_low = repo.insert_note(&draft_at("tie a", "", 3_000)).unwrap();
    let tie_high = repo.insert_note(&draft_at("tie b", "", 3_000)).unwrap();

    let listed = repo.list_notes().unwrap();
    let ids: Vec<_> = listed.iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![tie_high, tie_low, newest, middle, oldest]);
}

#[test]
fn notes_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memopad.db");

    let id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();
        repo.insert_note(&NoteDraft::new("durable", "still here")).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let loaded = repo.get_note(id).unwrap().unwrap();
    assert_eq!(loaded.title, "durable");
    assert_eq!(loaded.content, "still here");
}

#[test]
fn get_rejects_invalid_persisted_completion_value() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let id = repo.insert_note(&NoteDraft::new("broken", "")).unwrap();

    conn.execute("UPDATE notes SET is_completed = 5 WHERE id = ?1;", [id])
        .unwrap();

    let err = repo.get_note(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteNoteRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_notes_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "user_version", supported_version())
        .unwrap();

    let result = SqliteNoteRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("notes"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );",
    )
    .unwrap();
    conn.pragma_update(None, "user_version", supported_version())
        .unwrap();

    let result = SqliteNoteRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "notes",
            column: "updated_at"
        })
    ));
}

//! Schema migration registry.
//!
//! Each entry pairs a target `user_version` with the SQL that takes the
//! schema there. Entries must stay in strictly increasing version order;
//! every step runs in its own transaction so a failure leaves the database
//! at the last fully-applied revision.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Highest schema revision this binary can read and write.
pub fn supported_version() -> u32 {
    MIGRATIONS.last().map_or(0, |&(version, _)| version)
}

/// Brings `conn` up to [`supported_version`], applying pending steps in order.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = user_version(conn)?;
    let supported = supported_version();
    if found > supported {
        return Err(DbError::SchemaAhead { found, supported });
    }

    for &(version, sql) in MIGRATIONS {
        if version <= found {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        debug!("event=db_migrate module=db status=ok version={version}");
    }

    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

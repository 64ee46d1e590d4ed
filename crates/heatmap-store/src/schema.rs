use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT_MS: i64 = 5000;

pub fn initialize(conn: &Connection) -> Result<()> {
    configure(conn)?;

    // Force-checkpoint any stale WAL data into the main DB on startup.
    // Errors are non-fatal: in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS frame_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path   TEXT NOT NULL,
            captured_at INTEGER NOT NULL,
            frame_type  TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_frame_key ON frame_log(frame_type, captured_at);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Writer connection settings. WAL mode persists in the file, so readers
/// inherit it without setting it.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    // ~400KB between checkpoints instead of the default ~4MB
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;
    Ok(())
}

/// Prepare a read-only connection. Only a database that has never been
/// opened gets initialized; after that the connection refuses writes.
pub fn prepare_reader(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    if !has_frame_log(conn)? {
        initialize(conn)?;
    }
    conn.pragma_update(None, "query_only", true)?;
    Ok(())
}

fn has_frame_log(conn: &Connection) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'frame_log'",
        [],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

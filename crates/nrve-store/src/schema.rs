use rusqlite::Connection;

use nrve_core::NrveError;

pub fn init_db(conn: &Connection) -> Result<(), NrveError> {
    // `seq` records insertion order; "store order" is seq DESC.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL,
            title TEXT NOT NULL,
            preview TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            favorite INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_entries_updated ON entries(updated_at);
        CREATE INDEX IF NOT EXISTS idx_entries_favorite ON entries(favorite);
        ",
    )
    .map_err(|e| NrveError::Database(e.to_string()))?;

    Ok(())
}

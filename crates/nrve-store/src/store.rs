use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use nrve_core::{
    entry_matches, format_timestamp, DocumentEntry, JournalDocument, JournalEntry, JournalStore,
    NrveError, NrveResult,
};

use crate::schema::init_db;

/// SQLite-backed journal. Every write is a single-row statement (or one
/// transaction) issued while holding the connection lock, so concurrent
/// requests cannot lose each other's updates.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &Path) -> NrveResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NrveError::Database(format!("cannot create db directory: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| NrveError::Database(format!("cannot open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| NrveError::Database(e.to_string()))?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> NrveResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| NrveError::Database(format!("cannot open in-memory db: {e}")))?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> NrveResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NrveError::Database("store lock poisoned".into()))
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<JournalEntry> {
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    Ok(JournalEntry {
        id: row.get(0)?,
        text: row.get(1)?,
        title: row.get(2)?,
        preview: row.get(3)?,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
        favorite: row.get(6)?,
    })
}

const SELECT_COLS: &str = "id, text, title, preview, created_at, updated_at, favorite";

fn insert_entry(conn: &Connection, entry: &JournalEntry, or_ignore: bool) -> NrveResult<usize> {
    let verb = if or_ignore {
        "INSERT OR IGNORE"
    } else {
        "INSERT"
    };
    conn.execute(
        &format!(
            "{verb} INTO entries (id, text, title, preview, created_at, updated_at, favorite)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ),
        params![
            entry.id,
            entry.text,
            entry.title,
            entry.preview,
            format_timestamp(&entry.created_at),
            format_timestamp(&entry.updated_at),
            entry.favorite,
        ],
    )
    .map_err(|e| NrveError::Database(e.to_string()))
}

fn get_entry(conn: &Connection, id: &str) -> NrveResult<Option<JournalEntry>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLS} FROM entries WHERE id = ?1"),
        params![id],
        row_to_entry,
    )
    .optional()
    .map_err(|e| NrveError::Database(e.to_string()))
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> NrveResult<Vec<JournalEntry>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| NrveError::Database(e.to_string()))?;

    let rows = stmt
        .query_map(params, row_to_entry)
        .map_err(|e| NrveError::Database(e.to_string()))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| NrveError::Database(e.to_string()))?);
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// JournalStore impl
// ---------------------------------------------------------------------------

impl JournalStore for SqliteStore {
    fn create(&self, text: &str) -> NrveResult<JournalEntry> {
        let entry = JournalEntry::new(text)?;
        let conn = self.conn()?;
        insert_entry(&conn, &entry, false)?;
        debug!(id = %entry.id, "journal entry created");
        Ok(entry)
    }

    fn get(&self, id: &str) -> NrveResult<Option<JournalEntry>> {
        let conn = self.conn()?;
        get_entry(&conn, id)
    }

    fn delete(&self, id: &str) -> NrveResult<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM entries WHERE id = ?1", params![id])
            .map_err(|e| NrveError::Database(e.to_string()))?;
        debug!(id, removed, "journal entry delete");
        Ok(removed)
    }

    fn set_favorite(&self, id: &str, favorite: bool) -> NrveResult<JournalEntry> {
        let conn = self.conn()?;
        let mut entry = get_entry(&conn, id)?.ok_or_else(|| NrveError::NotFound(id.into()))?;

        entry.favorite = favorite;
        entry.touch();

        let changed = conn
            .execute(
                "UPDATE entries SET favorite = ?2, updated_at = ?3 WHERE id = ?1",
                params![entry.id, entry.favorite, format_timestamp(&entry.updated_at)],
            )
            .map_err(|e| NrveError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(NrveError::NotFound(id.into()));
        }
        Ok(entry)
    }

    fn list(&self) -> NrveResult<Vec<JournalEntry>> {
        let conn = self.conn()?;
        query_entries(
            &conn,
            &format!(
                "SELECT {SELECT_COLS} FROM entries
                 ORDER BY COALESCE(updated_at, created_at) DESC, seq DESC"
            ),
            [],
        )
    }

    fn recent(&self, limit: usize) -> NrveResult<Vec<JournalEntry>> {
        let conn = self.conn()?;
        query_entries(
            &conn,
            &format!("SELECT {SELECT_COLS} FROM entries ORDER BY seq DESC LIMIT ?1"),
            params![limit as i64],
        )
    }

    fn all_in_store_order(&self) -> NrveResult<Vec<JournalEntry>> {
        let conn = self.conn()?;
        query_entries(
            &conn,
            &format!("SELECT {SELECT_COLS} FROM entries ORDER BY seq DESC"),
            [],
        )
    }

    fn search(&self, query: &str, limit: usize) -> NrveResult<Vec<JournalEntry>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        // SQLite's LIKE only folds ASCII case, so match in Rust.
        let needle = query.to_lowercase();
        Ok(self
            .all_in_store_order()?
            .into_iter()
            .filter(|e| entry_matches(e, &needle))
            .take(limit)
            .collect())
    }

    fn import_document(&self, doc: JournalDocument) -> NrveResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| NrveError::Database(e.to_string()))?;

        // The document lists newest first; insert oldest first so seq order matches.
        let mut imported = 0;
        for entry in doc
            .entries
            .into_iter()
            .rev()
            .filter_map(DocumentEntry::into_entry)
        {
            imported += insert_entry(&tx, &entry, true)?;
        }

        tx.commit()
            .map_err(|e| NrveError::Database(e.to_string()))?;
        Ok(imported)
    }

    fn export_document(&self) -> NrveResult<JournalDocument> {
        Ok(JournalDocument {
            entries: self
                .all_in_store_order()?
                .into_iter()
                .map(DocumentEntry::from)
                .collect(),
        })
    }

    fn count(&self) -> NrveResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .map_err(|e| NrveError::Database(e.to_string()))?;
        Ok(count as usize)
    }
}

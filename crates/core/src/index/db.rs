//! Database connection and row operations.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::schema::{init_schema, SchemaError};
use super::types::{NoteRow, RecordRow};
use crate::identity::Identity;
use crate::kv::TypedKv;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("index is busy; retry or run reindex")]
    Busy,

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return Self::Busy;
            }
        }
        Self::Database(e)
    }
}

/// Handle to the embedded index database.
pub struct IndexDb {
    conn: Connection,
}

impl IndexDb {
    /// Open or create the index at the given path.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path)?;
        // Timeout first so a concurrent opener waits instead of failing.
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
             PRAGMA journal_mode = WAL;"
        ))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(super) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ─────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or replace a record row together with its KV rows.
    pub fn upsert_record(&self, row: &RecordRow, kv: &TypedKv) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO records
             (id, title, author_handle, author_email, created_at, modified_at, body, extra_json, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.id,
                row.title,
                row.author.handle,
                row.author.email,
                format_ts(row.created_at),
                format_ts(row.modified_at),
                row.body,
                row.extra_json,
                format_ts(Utc::now()),
            ],
        )?;
        replace_kv(&tx, &row.id, kv)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a record row, its KV rows, and all of its notes' rows.
    pub fn remove_record(&self, record_id: &str) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        for table in ["kv_strings", "kv_integers", "kv_floats"] {
            tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE owner_id = ?1
                     OR owner_id IN (SELECT id FROM notes WHERE record_id = ?1)"
                ),
                [record_id],
            )?;
        }
        tx.execute("DELETE FROM notes WHERE record_id = ?1", [record_id])?;
        tx.execute("DELETE FROM records WHERE id = ?1", [record_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_record_row(&self, record_id: &str) -> Result<Option<RecordRow>, IndexError> {
        self.conn
            .query_row(
                "SELECT id, title, author_handle, author_email, created_at, modified_at, body, extra_json
                 FROM records WHERE id = ?1",
                [record_id],
                row_to_record,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All indexed record ids, sorted.
    pub fn record_ids(&self) -> Result<Vec<String>, IndexError> {
        let mut stmt = self.conn.prepare("SELECT id FROM records ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    pub fn count_records(&self) -> Result<i64, IndexError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────

    pub fn upsert_note(&self, row: &NoteRow, kv: &TypedKv) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO notes
             (id, record_id, author_handle, author_email, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.record_id,
                row.author.handle,
                row.author.email,
                format_ts(row.created_at),
                row.body,
            ],
        )?;
        replace_kv(&tx, &row.id, kv)?;
        tx.commit()?;
        Ok(())
    }

    pub fn remove_note(&self, note_id: &str) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        for table in ["kv_strings", "kv_integers", "kv_floats"] {
            tx.execute(&format!("DELETE FROM {table} WHERE owner_id = ?1"), [note_id])?;
        }
        tx.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Notes for one record, oldest first.
    pub fn note_rows(&self, record_id: &str) -> Result<Vec<NoteRow>, IndexError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_id, author_handle, author_email, created_at, body
             FROM notes WHERE record_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map([record_id], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All indexed (note_id, record_id) pairs, sorted by note id.
    pub fn note_ids(&self) -> Result<Vec<(String, String)>, IndexError> {
        let mut stmt =
            self.conn.prepare("SELECT id, record_id FROM notes ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────

    /// Drop every row; the schema stays.
    pub fn clear_all(&self) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        for table in ["records", "notes", "kv_strings", "kv_integers", "kv_floats"] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn replace_kv(
    tx: &rusqlite::Transaction<'_>,
    owner_id: &str,
    kv: &TypedKv,
) -> Result<(), IndexError> {
    for table in ["kv_strings", "kv_integers", "kv_floats"] {
        tx.execute(&format!("DELETE FROM {table} WHERE owner_id = ?1"), [owner_id])?;
    }
    for (key, values) in &kv.strings {
        for value in values {
            tx.execute(
                "INSERT OR IGNORE INTO kv_strings (owner_id, key, value) VALUES (?1, ?2, ?3)",
                params![owner_id, key, value],
            )?;
        }
    }
    for (key, values) in &kv.integers {
        for value in values {
            tx.execute(
                "INSERT OR IGNORE INTO kv_integers (owner_id, key, value) VALUES (?1, ?2, ?3)",
                params![owner_id, key, value],
            )?;
        }
    }
    for (key, values) in &kv.floats {
        for value in values {
            tx.execute(
                "INSERT OR IGNORE INTO kv_floats (owner_id, key, value) VALUES (?1, ?2, ?3)",
                params![owner_id, key, value],
            )?;
        }
    }
    Ok(())
}

pub(super) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

pub(super) fn row_to_record(row: &rusqlite::Row<'_>) -> Result<RecordRow, rusqlite::Error> {
    let created: String = row.get(4)?;
    let modified: String = row.get(5)?;
    Ok(RecordRow {
        id: row.get(0)?,
        title: row.get(1)?,
        author: Identity::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
        created_at: parse_ts(&created),
        modified_at: parse_ts(&modified),
        body: row.get(6)?,
        extra_json: row.get(7)?,
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> Result<NoteRow, rusqlite::Error> {
    let created: String = row.get(4)?;
    Ok(NoteRow {
        id: row.get(0)?,
        record_id: row.get(1)?,
        author: Identity::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
        created_at: parse_ts(&created),
        body: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_row(id: &str, title: &str) -> RecordRow {
        RecordRow {
            id: id.to_string(),
            title: title.to_string(),
            author: Identity::new("alice", "alice@example.com"),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
            modified_at: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
            body: "body text".to_string(),
            extra_json: None,
        }
    }

    #[test]
    fn upsert_then_get() {
        let db = IndexDb::open_in_memory().unwrap();
        let mut kv = TypedKv::new();
        kv.strings.insert("component".into(), vec!["auth".into()]);

        db.upsert_record(&sample_row("REC-00001", "Fix login bug"), &kv).unwrap();

        let row = db.get_record_row("REC-00001").unwrap().unwrap();
        assert_eq!(row.title, "Fix login bug");
        assert_eq!(row.author.handle, "alice");

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_strings WHERE owner_id = 'REC-00001'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn upsert_replaces_kv_rows() {
        let db = IndexDb::open_in_memory().unwrap();
        let row = sample_row("REC-00001", "T");

        let mut kv = TypedKv::new();
        kv.strings.insert("env".into(), vec!["prod".into(), "staging".into()]);
        db.upsert_record(&row, &kv).unwrap();

        let mut kv2 = TypedKv::new();
        kv2.integers.insert("count".into(), vec![5]);
        db.upsert_record(&row, &kv2).unwrap();

        let strings: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_strings", [], |r| r.get(0))
            .unwrap();
        let integers: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_integers", [], |r| r.get(0))
            .unwrap();
        assert_eq!(strings, 0);
        assert_eq!(integers, 1);
    }

    #[test]
    fn remove_record_cascades_to_notes_and_kv() {
        let db = IndexDb::open_in_memory().unwrap();
        let mut kv = TypedKv::new();
        kv.strings.insert("k".into(), vec!["v".into()]);
        db.upsert_record(&sample_row("REC-00001", "T"), &kv).unwrap();

        let note = NoteRow {
            id: "NT-00001".into(),
            record_id: "REC-00001".into(),
            author: Identity::new("bob", "bob@example.com"),
            created_at: Utc::now(),
            body: "note".into(),
        };
        db.upsert_note(&note, &kv).unwrap();

        db.remove_record("REC-00001").unwrap();

        assert!(db.get_record_row("REC-00001").unwrap().is_none());
        assert!(db.note_ids().unwrap().is_empty());
        let kv_rows: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_strings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(kv_rows, 0);
    }

    #[test]
    fn note_rows_are_ordered_oldest_first() {
        let db = IndexDb::open_in_memory().unwrap();
        db.upsert_record(&sample_row("REC-00001", "T"), &TypedKv::new()).unwrap();

        for (i, ts) in [(2, 12), (1, 10), (3, 14)] {
            let note = NoteRow {
                id: format!("NT-0000{i}"),
                record_id: "REC-00001".into(),
                author: Identity::new("bob", "bob@example.com"),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, ts, 0, 0).unwrap(),
                body: "n".into(),
            };
            db.upsert_note(&note, &TypedKv::new()).unwrap();
        }

        let rows = db.note_rows("REC-00001").unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["NT-00001", "NT-00002", "NT-00003"]);
    }

    #[test]
    fn clear_all_empties_every_table() {
        let db = IndexDb::open_in_memory().unwrap();
        let mut kv = TypedKv::new();
        kv.floats.insert("rate".into(), vec![0.5]);
        db.upsert_record(&sample_row("REC-00001", "T"), &kv).unwrap();

        db.clear_all().unwrap();
        assert_eq!(db.count_records().unwrap(), 0);
        let kv_rows: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_floats", [], |r| r.get(0))
            .unwrap();
        assert_eq!(kv_rows, 0);
    }
}

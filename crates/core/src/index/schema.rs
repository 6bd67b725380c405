//! SQLite schema definition and migrations.

use rusqlite::Connection;
use thiserror::Error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("no migration path from schema version {0}")]
    MigrationFailed(i32),
}

/// Initialize or migrate the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        // Only v1 exists so far.
        return Err(SchemaError::MigrationFailed(version));
    } else if version > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Records: one row per record file
        CREATE TABLE records (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_handle TEXT NOT NULL,
            author_email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            body TEXT NOT NULL,
            extra_json TEXT,
            indexed_at TEXT NOT NULL
        );

        CREATE INDEX idx_records_modified ON records(modified_at);

        -- Notes: one row per note file, keyed to the parent record
        CREATE TABLE notes (
            id TEXT PRIMARY KEY,
            record_id TEXT NOT NULL,
            author_handle TEXT NOT NULL,
            author_email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            body TEXT NOT NULL
        );

        CREATE INDEX idx_notes_record ON notes(record_id);

        -- Typed KV projections; owner_id is a record or note id
        CREATE TABLE kv_strings (
            owner_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (owner_id, key, value)
        );

        CREATE INDEX idx_kv_strings_key ON kv_strings(key);
        CREATE INDEX idx_kv_strings_value ON kv_strings(value);

        CREATE TABLE kv_integers (
            owner_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value INTEGER NOT NULL,
            PRIMARY KEY (owner_id, key, value)
        );

        CREATE INDEX idx_kv_integers_key ON kv_integers(key);
        CREATE INDEX idx_kv_integers_value ON kv_integers(value);

        CREATE TABLE kv_floats (
            owner_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (owner_id, key, value)
        );

        CREATE INDEX idx_kv_floats_key ON kv_floats(key);
        CREATE INDEX idx_kv_floats_value ON kv_floats(value);
        "#,
    )?;

    Ok(())
}

//! Authoritative file store.
//!
//! One file per document: records live flat under `records/`, a record's
//! notes live in a subdirectory named after the record id. The directory is
//! the join key — no manifest file exists. All writes go through a temp
//! file in the destination directory followed by an atomic rename, so a
//! crash never leaves a half-written document under its final name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

pub const RECORDS_DIR: &str = "records";
pub const DOC_EXTENSION: &str = "md";
/// Filename of the derived index, excluded from document enumeration.
pub const INDEX_FILE: &str = "index.db";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id} not found")]
    NotFound { id: String },

    #[error("document {id} already exists")]
    AlreadyExists { id: String },

    #[error("store root {0} does not exist (run init first)")]
    MissingRoot(String),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Handle to a store's file tree.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open an existing store root.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.join(RECORDS_DIR).is_dir() {
            return Err(StoreError::MissingRoot(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Create the directory layout for a fresh store.
    pub fn init(root: &Path) -> Result<Self, StoreError> {
        let records = root.join(RECORDS_DIR);
        fs::create_dir_all(&records).map_err(|e| StoreError::io(&records, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root.join(RECORDS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn record_path(&self, record_id: &str) -> PathBuf {
        self.records_dir()
            .join(format!("{record_id}.{DOC_EXTENSION}"))
    }

    pub fn notes_dir(&self, record_id: &str) -> PathBuf {
        self.records_dir().join(record_id)
    }

    pub fn note_path(&self, record_id: &str, note_id: &str) -> PathBuf {
        self.notes_dir(record_id)
            .join(format!("{note_id}.{DOC_EXTENSION}"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────

    /// Atomically create a record file; fails if the id is taken.
    pub fn create_record(&self, record_id: &str, text: &str) -> Result<(), StoreError> {
        write_new(&self.record_path(record_id), record_id, text)
    }

    /// Read a record's exact committed bytes.
    pub fn read_record(&self, record_id: &str) -> Result<String, StoreError> {
        read_document(&self.record_path(record_id), record_id)
    }

    /// Replace a record file in place (temp + rename; readers never see a
    /// partial write).
    pub fn update_record(&self, record_id: &str, text: &str) -> Result<(), StoreError> {
        let path = self.record_path(record_id);
        if !path.exists() {
            return Err(StoreError::NotFound {
                id: record_id.to_string(),
            });
        }
        write_over(&path, text)
    }

    /// Remove a record file. The caller is responsible for notes and index.
    pub fn delete_record(&self, record_id: &str) -> Result<(), StoreError> {
        let path = self.record_path(record_id);
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    id: record_id.to_string(),
                }
            } else {
                StoreError::io(&path, e)
            }
        })
    }

    pub fn record_exists(&self, record_id: &str) -> bool {
        self.record_path(record_id).is_file()
    }

    /// All record ids, sorted ascending.
    pub fn list_records(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.records_dir();
        let mut ids = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() {
                if let Some(id) = document_stem(&path) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────

    /// Atomically create a note under an existing record.
    pub fn create_note(
        &self,
        record_id: &str,
        note_id: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        if !self.record_exists(record_id) {
            return Err(StoreError::NotFound {
                id: record_id.to_string(),
            });
        }
        write_new(&self.note_path(record_id, note_id), note_id, text)
    }

    pub fn read_note(&self, record_id: &str, note_id: &str) -> Result<String, StoreError> {
        read_document(&self.note_path(record_id, note_id), note_id)
    }

    /// Remove a record's notes directory and everything in it.
    pub fn delete_notes(&self, record_id: &str) -> Result<(), StoreError> {
        let dir = self.notes_dir(record_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }

    /// Note ids under a record, sorted ascending. A record without a notes
    /// directory simply has no notes.
    pub fn list_notes(&self, record_id: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.notes_dir(record_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() {
                if let Some(id) = document_stem(&path) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Stem of a `*.md` document path; other files are ignored.
fn document_stem(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn read_document(path: &Path, id: &str) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound { id: id.to_string() }
        } else {
            StoreError::io(path, e)
        }
    })
}

/// Test-and-create: temp file in the destination directory, then a
/// no-clobber rename. Losing a race surfaces as `AlreadyExists`.
fn write_new(path: &Path, id: &str, text: &str) -> Result<(), StoreError> {
    let dir = parent_dir(path)?;
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;

    tmp.persist_noclobber(path).map(|_| ()).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            StoreError::AlreadyExists { id: id.to_string() }
        } else {
            StoreError::io(path, e.error)
        }
    })
}

fn write_over(path: &Path, text: &str) -> Result<(), StoreError> {
    let dir = parent_dir(path)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| StoreError::io(path, e.error))
}

fn parent_dir(path: &Path) -> Result<&Path, StoreError> {
    path.parent().ok_or_else(|| StoreError::Io {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fresh_store() -> (tempfile::TempDir, FileStore) {
        let tmp = tempdir().unwrap();
        let store = FileStore::init(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn create_then_read_back() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00001", "hello\n").unwrap();
        assert_eq!(store.read_record("REC-00001").unwrap(), "hello\n");
    }

    #[test]
    fn create_existing_id_collides() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00001", "first\n").unwrap();
        let err = store.create_record("REC-00001", "second\n").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        // Loser's write must not damage the winner's content.
        assert_eq!(store.read_record("REC-00001").unwrap(), "first\n");
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_tmp, store) = fresh_store();
        assert!(matches!(
            store.read_record("REC-99999"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_replaces_content() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00001", "v1\n").unwrap();
        store.update_record("REC-00001", "v2\n").unwrap();
        assert_eq!(store.read_record("REC-00001").unwrap(), "v2\n");
    }

    #[test]
    fn update_missing_is_not_found() {
        let (_tmp, store) = fresh_store();
        assert!(matches!(
            store.update_record("REC-00001", "x"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn note_requires_existing_parent() {
        let (_tmp, store) = fresh_store();
        let err = store.create_note("REC-00001", "NT-00001", "n\n").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        store.create_record("REC-00001", "r\n").unwrap();
        store.create_note("REC-00001", "NT-00001", "n\n").unwrap();
        assert_eq!(store.read_note("REC-00001", "NT-00001").unwrap(), "n\n");
    }

    #[test]
    fn listings_are_sorted_and_scoped() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00002", "b\n").unwrap();
        store.create_record("REC-00001", "a\n").unwrap();
        store.create_note("REC-00001", "NT-00002", "n2\n").unwrap();
        store.create_note("REC-00001", "NT-00001", "n1\n").unwrap();

        assert_eq!(store.list_records().unwrap(), vec!["REC-00001", "REC-00002"]);
        assert_eq!(
            store.list_notes("REC-00001").unwrap(),
            vec!["NT-00001", "NT-00002"]
        );
        assert!(store.list_notes("REC-00002").unwrap().is_empty());
    }

    #[test]
    fn delete_notes_removes_directory() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00001", "r\n").unwrap();
        store.create_note("REC-00001", "NT-00001", "n\n").unwrap();
        store.delete_notes("REC-00001").unwrap();
        assert!(store.list_notes("REC-00001").unwrap().is_empty());
        // Deleting again is a no-op.
        store.delete_notes("REC-00001").unwrap();
    }

    #[test]
    fn non_document_files_are_ignored_in_listings() {
        let (_tmp, store) = fresh_store();
        store.create_record("REC-00001", "r\n").unwrap();
        fs::write(store.records_dir().join("stray.txt"), "x").unwrap();
        assert_eq!(store.list_records().unwrap(), vec!["REC-00001"]);
    }

    #[test]
    fn open_requires_initialized_layout() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            FileStore::open(tmp.path()),
            Err(StoreError::MissingRoot(_))
        ));
        FileStore::init(tmp.path()).unwrap();
        assert!(FileStore::open(tmp.path()).is_ok());
    }
}

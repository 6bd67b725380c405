//! Index rebuilding from file store contents.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use walkdir::WalkDir;

use super::db::{IndexDb, IndexError};
use super::types::{NoteRow, RecordRow};
use crate::frontmatter::HeaderFormat;
use crate::model::{Note, Record};
use crate::store::{FileStore, StoreError, DOC_EXTENSION};

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("file store error: {0}")]
    Store(#[from] StoreError),

    #[error("index database error: {0}")]
    Index(#[from] IndexError),

    #[error("failed to parse {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: crate::model::DocumentError,
    },
}

/// Statistics from a rebuild.
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    /// Records successfully indexed.
    pub records_indexed: usize,
    /// Notes successfully indexed.
    pub notes_indexed: usize,
    /// Documents that failed to parse and were skipped.
    pub skipped: Vec<String>,
    /// True when a cancellation request stopped the rebuild early.
    pub interrupted: bool,
}

/// Progress callback: (current, total, document id).
pub type ProgressCallback<'a> = &'a dyn Fn(usize, usize, &str);

/// Everything found by one sweep of the store tree.
#[derive(Debug, Default)]
pub struct StoreListing {
    pub records: Vec<String>,
    /// (record_id, note_id) pairs.
    pub notes: Vec<(String, String)>,
}

/// Enumerate every document file under `records/`.
///
/// Depth 1 files are records, depth 2 files are notes under their record's
/// directory. The listing is sorted so callers see a deterministic order;
/// the rebuild result does not depend on it.
pub fn enumerate_store(store: &FileStore) -> Result<StoreListing, StoreError> {
    let root = store.records_dir();
    let mut listing = StoreListing::default();

    for entry in WalkDir::new(&root).min_depth(1).max_depth(2).follow_links(false) {
        let entry = entry.map_err(|e| StoreError::Io {
            path: root.display().to_string(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(DOC_EXTENSION)
        {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match entry.depth() {
            1 => listing.records.push(id.to_string()),
            2 => {
                if let Some(record_id) = parent_name(path) {
                    listing.notes.push((record_id, id.to_string()));
                }
            }
            _ => {}
        }
    }

    listing.records.sort();
    listing.notes.sort();
    Ok(listing)
}

fn parent_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

/// Rebuilds the index from the file store alone.
pub struct IndexBuilder<'a> {
    db: &'a IndexDb,
    store: &'a FileStore,
    format: HeaderFormat,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(db: &'a IndexDb, store: &'a FileStore, format: HeaderFormat) -> Self {
        Self { db, store, format }
    }

    /// Drop every row and repopulate by re-parsing the files.
    ///
    /// One index transaction per document: a cancellation request (checked
    /// between documents) can stop the sweep early without tearing any
    /// single document's row/KV pair. Unparseable files are skipped with a
    /// warning and reported in the stats.
    pub fn rebuild_all(
        &self,
        cancel: Option<&AtomicBool>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<RebuildStats, BuilderError> {
        let listing = enumerate_store(self.store)?;
        let total = listing.records.len() + listing.notes.len();
        let mut stats = RebuildStats::default();
        let mut current = 0;

        self.db.clear_all()?;

        for record_id in &listing.records {
            if is_cancelled(cancel) {
                stats.interrupted = true;
                return Ok(stats);
            }
            current += 1;
            if let Some(cb) = progress {
                cb(current, total, record_id);
            }
            match self.index_record(record_id) {
                Ok(()) => stats.records_indexed += 1,
                Err(BuilderError::Index(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("skipping {record_id}: {e}");
                    stats.skipped.push(record_id.clone());
                }
            }
        }

        for (record_id, note_id) in &listing.notes {
            if is_cancelled(cancel) {
                stats.interrupted = true;
                return Ok(stats);
            }
            current += 1;
            if let Some(cb) = progress {
                cb(current, total, note_id);
            }
            match self.index_note(record_id, note_id) {
                Ok(()) => stats.notes_indexed += 1,
                Err(BuilderError::Index(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("skipping {note_id}: {e}");
                    stats.skipped.push(note_id.clone());
                }
            }
        }

        Ok(stats)
    }

    fn index_record(&self, record_id: &str) -> Result<(), BuilderError> {
        let text = self.store.read_record(record_id)?;
        let record = Record::from_document(record_id, &text, self.format).map_err(|e| {
            BuilderError::Parse {
                id: record_id.to_string(),
                source: e,
            }
        })?;
        self.db.upsert_record(&RecordRow::from(&record), &record.kv)?;
        Ok(())
    }

    fn index_note(&self, record_id: &str, note_id: &str) -> Result<(), BuilderError> {
        let text = self.store.read_note(record_id, note_id)?;
        let note =
            Note::from_document(note_id, record_id, &text, self.format).map_err(|e| {
                BuilderError::Parse {
                    id: note_id.to_string(),
                    source: e,
                }
            })?;
        self.db.upsert_note(&NoteRow::from(&note), &note.kv)?;
        Ok(())
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

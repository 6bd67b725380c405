//! High-level store API.
//!
//! Every write goes file-first: serialize, land the file atomically, then
//! mirror the change into the index. The file is authoritative — an index
//! failure after a successful file write is reported as a warning on the
//! outcome, never rolled back, and heals on the next rebuild.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::config::{
    load_store_config, save_store_config, ConfigError, StoreConfig,
};
use crate::frontmatter::FieldValue;
use crate::identity::Identity;
use crate::ids::{self, IdKind, IdScheme, MAX_ALLOC_ATTEMPTS};
use crate::index::{
    diagnose, search_records, BuilderError, ConsistencyReport, DiagnoseError, IndexBuilder,
    IndexDb, IndexError, NoteRow, RecordQuery, RecordRow, RebuildStats,
};
use crate::kv::{self, ExprError, KvAssign, KvError, TypedKv};
use crate::model::{DocumentError, Note, Record};
use crate::store::{FileStore, StoreError};

/// Busy-index retries on the write path.
const INDEX_RETRIES: u32 = 3;
const INDEX_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to parse {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: DocumentError,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Allocation(#[from] ids::IdError),

    #[error(transparent)]
    Rebuild(#[from] BuilderError),

    #[error("store and index have drifted apart ({drift} entries); run reindex")]
    Consistency { drift: usize },
}

impl From<DiagnoseError> for TrackerError {
    fn from(e: DiagnoseError) -> Self {
        match e {
            DiagnoseError::Store(e) => Self::Store(e),
            DiagnoseError::Index(e) => Self::Index(e),
        }
    }
}

impl TrackerError {
    /// Stable error kind for scripted responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(StoreError::NotFound { .. }) => "not_found",
            Self::Store(StoreError::AlreadyExists { .. }) => "collision",
            Self::Store(StoreError::MissingRoot(_)) => "not_found",
            Self::Store(StoreError::Io { .. }) => "io",
            Self::Index(IndexError::Busy) => "busy",
            Self::Index(_) => "io",
            Self::Parse { source, .. } | Self::Document(source) => match source {
                DocumentError::Format(_) => "format",
                DocumentError::Kv(_) => "type",
                DocumentError::MissingField { .. } | DocumentError::BadTimestamp { .. } => {
                    "format"
                }
            },
            Self::Kv(_) | Self::Expr(_) => "type",
            Self::Config(_) => "config",
            Self::Allocation(_) => "allocation",
            Self::Rebuild(_) => "io",
            Self::Consistency { .. } => "consistency",
        }
    }

    /// Whether a caller may reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Index(IndexError::Busy))
    }
}

/// Everything needed to create a record.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub title: String,
    pub body: String,
    pub kv: TypedKv,
    pub extra: Vec<(String, FieldValue)>,
}

/// Metadata changes applied to an existing record.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub extra: Vec<(String, FieldValue)>,
    /// Single-value assignments (replace the key).
    pub kv_set: Vec<KvAssign>,
    /// Multi-value assignments (append to the key).
    pub kv_add: Vec<KvAssign>,
}

/// Result of a write. `index_warning` is set when the file landed but the
/// index could not be updated; the store stays usable and `reindex` heals.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub id: String,
    pub index_warning: Option<String>,
}

/// Handle to one store: file tree, index, and configuration.
pub struct Tracker {
    store: FileStore,
    db: IndexDb,
    config: StoreConfig,
    root: PathBuf,
}

impl Tracker {
    /// Initialize a fresh store and open it.
    pub fn init(root: &Path, config: StoreConfig) -> Result<Self, TrackerError> {
        let store = FileStore::init(root)?;
        save_store_config(root, &config)?;
        let db = IndexDb::open(&store.index_path())?;
        Ok(Self {
            store,
            db,
            config,
            root: root.to_path_buf(),
        })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self, TrackerError> {
        let config = load_store_config(root)?;
        let store = FileStore::open(root)?;
        let db = IndexDb::open(&store.index_path())?;
        Ok(Self {
            store,
            db,
            config,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────

    /// Create a record attributed to `author`.
    ///
    /// Identifier allocation is propose/dispose: the atomic file create is
    /// the arbiter, and a lost race just means another proposal, up to a
    /// bounded budget.
    pub fn create_record(
        &self,
        draft: RecordDraft,
        author: &Identity,
    ) -> Result<WriteOutcome, TrackerError> {
        let now = Utc::now();
        let record_for = |id: &str| Record {
            id: id.to_string(),
            title: draft.title.clone(),
            author: author.clone(),
            created_at: now,
            modified_at: now,
            kv: draft.kv.clone(),
            extra: draft.extra.clone(),
            body: draft.body.clone(),
        };

        let mut created: Option<Record> = None;
        for _ in 0..MAX_ALLOC_ATTEMPTS {
            let existing = match self.config.id_scheme {
                IdScheme::Sequential => self.store.list_records()?,
                IdScheme::Random => Vec::new(),
            };
            let id = ids::new_id(IdKind::Record, self.config.id_scheme, &existing);
            let record = record_for(&id);
            let text = record.to_document(self.config.format)?;
            match self.store.create_record(&id, &text) {
                Ok(()) => {
                    created = Some(record);
                    break;
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    tracing::debug!("id {id} lost the race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let record = created.ok_or(ids::IdError::Allocation {
            kind: IdKind::Record.as_str(),
            attempts: MAX_ALLOC_ATTEMPTS,
        })?;

        let warning = self.index_record(&record);
        Ok(WriteOutcome {
            id: record.id,
            index_warning: warning,
        })
    }

    /// Read a record from its file (the authoritative copy).
    pub fn get_record(&self, record_id: &str) -> Result<Record, TrackerError> {
        let text = self.store.read_record(record_id)?;
        Record::from_document(record_id, &text, self.config.format).map_err(|e| {
            TrackerError::Parse {
                id: record_id.to_string(),
                source: e,
            }
        })
    }

    /// Apply a metadata patch: parse, merge, re-serialize. Bumps the
    /// modified timestamp monotonically.
    pub fn update_record(
        &self,
        record_id: &str,
        patch: &RecordPatch,
    ) -> Result<WriteOutcome, TrackerError> {
        let mut record = self.get_record(record_id)?;

        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        for (key, value) in &patch.extra {
            if let Some(slot) = record.extra.iter_mut().find(|(k, _)| k == key) {
                slot.1 = value.clone();
            } else {
                record.extra.push((key.clone(), value.clone()));
            }
        }
        kv::apply_assigns(&mut record.kv, &patch.kv_set);
        kv::apply_multi_assigns(&mut record.kv, &patch.kv_add);

        record.modified_at = Utc::now().max(record.created_at);

        let text = record.to_document(self.config.format)?;
        self.store.update_record(record_id, &text)?;

        let warning = self.index_record(&record);
        Ok(WriteOutcome {
            id: record_id.to_string(),
            index_warning: warning,
        })
    }

    /// Delete a record, its notes, and their index rows together.
    ///
    /// Files go first; if the index removal then fails the rows are
    /// orphaned (visible to `diagnose`) until the next rebuild.
    pub fn delete_record(&self, record_id: &str) -> Result<WriteOutcome, TrackerError> {
        if !self.store.record_exists(record_id) {
            return Err(StoreError::NotFound {
                id: record_id.to_string(),
            }
            .into());
        }
        self.store.delete_notes(record_id)?;
        self.store.delete_record(record_id)?;

        let warning = match with_index_retry(|| self.db.remove_record(record_id)) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("file removed but index cleanup failed for {record_id}: {e}");
                Some(format!("index cleanup failed: {e}"))
            }
        };
        Ok(WriteOutcome {
            id: record_id.to_string(),
            index_warning: warning,
        })
    }

    /// Query the index. Ordering: most-recently-modified first, ties by id.
    pub fn list_records(&self, query: &RecordQuery) -> Result<Vec<RecordRow>, TrackerError> {
        Ok(with_index_retry(|| search_records(&self.db, query))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────

    /// Append a note to an existing record. Notes are immutable once
    /// written.
    pub fn add_note(
        &self,
        record_id: &str,
        message: &str,
        note_kv: TypedKv,
        author: &Identity,
    ) -> Result<WriteOutcome, TrackerError> {
        if !self.store.record_exists(record_id) {
            return Err(StoreError::NotFound {
                id: record_id.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut created: Option<Note> = None;
        for _ in 0..MAX_ALLOC_ATTEMPTS {
            let existing = match self.config.id_scheme {
                IdScheme::Sequential => self.store.list_notes(record_id)?,
                IdScheme::Random => Vec::new(),
            };
            let id = ids::new_id(IdKind::Note, self.config.id_scheme, &existing);
            let note = Note {
                id: id.clone(),
                record_id: record_id.to_string(),
                author: author.clone(),
                created_at: now,
                kv: note_kv.clone(),
                body: message.to_string(),
            };
            let text = note.to_document(self.config.format)?;
            match self.store.create_note(record_id, &id, &text) {
                Ok(()) => {
                    created = Some(note);
                    break;
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    tracing::debug!("note id {id} lost the race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let note = created.ok_or(ids::IdError::Allocation {
            kind: IdKind::Note.as_str(),
            attempts: MAX_ALLOC_ATTEMPTS,
        })?;

        let warning = match with_index_retry(|| {
            self.db.upsert_note(&NoteRow::from(&note), &note.kv)
        }) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("note {} written but not indexed: {e}", note.id);
                Some(format!("note written but not indexed: {e}"))
            }
        };
        Ok(WriteOutcome {
            id: note.id,
            index_warning: warning,
        })
    }

    pub fn get_note(&self, record_id: &str, note_id: &str) -> Result<Note, TrackerError> {
        let text = self.store.read_note(record_id, note_id)?;
        Note::from_document(note_id, record_id, &text, self.config.format).map_err(|e| {
            TrackerError::Parse {
                id: note_id.to_string(),
                source: e,
            }
        })
    }

    /// Notes for a record, oldest first, from the index.
    pub fn list_notes(&self, record_id: &str) -> Result<Vec<NoteRow>, TrackerError> {
        if !self.store.record_exists(record_id) {
            return Err(StoreError::NotFound {
                id: record_id.to_string(),
            }
            .into());
        }
        Ok(with_index_retry(|| self.db.note_rows(record_id))?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────

    /// Rebuild the index from files. Interruptible between documents.
    pub fn rebuild_index(
        &self,
        cancel: Option<&AtomicBool>,
    ) -> Result<RebuildStats, TrackerError> {
        let builder = IndexBuilder::new(&self.db, &self.store, self.config.format);
        Ok(builder.rebuild_all(cancel, None)?)
    }

    /// Report drift between files and index without repairing it.
    pub fn diagnose(&self) -> Result<ConsistencyReport, TrackerError> {
        Ok(diagnose(&self.store, &self.db)?)
    }

    /// Fail with a consistency error when the store has drifted.
    pub fn check_consistent(&self) -> Result<(), TrackerError> {
        let report = self.diagnose()?;
        if report.is_clean() {
            Ok(())
        } else {
            Err(TrackerError::Consistency {
                drift: report.drift_count(),
            })
        }
    }

    fn index_record(&self, record: &Record) -> Option<String> {
        match with_index_retry(|| {
            self.db.upsert_record(&RecordRow::from(record), &record.kv)
        }) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("{} written but not indexed: {e}", record.id);
                Some(format!("record written but not indexed: {e}"))
            }
        }
    }
}

/// Retry a busy index a small fixed number of times with backoff; any
/// other error surfaces immediately.
fn with_index_retry<T>(
    mut op: impl FnMut() -> Result<T, IndexError>,
) -> Result<T, IndexError> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(IndexError::Busy) if attempt + 1 < INDEX_RETRIES => {
                attempt += 1;
                std::thread::sleep(INDEX_BACKOFF * attempt);
            }
            other => return other,
        }
    }
}

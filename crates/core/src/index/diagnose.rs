//! Consistency diagnosis between the file store and the index.
//!
//! Diagnosis and repair are distinct operations: this module only reports
//! drift; `rebuild_all` is the repair.

use std::collections::BTreeSet;

use super::builder::enumerate_store;
use super::db::{IndexDb, IndexError};
use crate::store::{FileStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagnoseError {
    #[error("file store error: {0}")]
    Store(#[from] StoreError),

    #[error("index database error: {0}")]
    Index(#[from] IndexError),
}

/// Result of comparing the two enumerations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    /// Index rows whose file no longer exists.
    pub orphaned_records: Vec<String>,
    /// Note rows whose file (or whose parent pairing) no longer exists.
    pub orphaned_notes: Vec<String>,
    /// Record files missing from the index.
    pub unindexed_records: Vec<String>,
    /// Note files missing from the index.
    pub unindexed_notes: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_records.is_empty()
            && self.orphaned_notes.is_empty()
            && self.unindexed_records.is_empty()
            && self.unindexed_notes.is_empty()
    }

    /// Total number of divergent entries.
    pub fn drift_count(&self) -> usize {
        self.orphaned_records.len()
            + self.orphaned_notes.len()
            + self.unindexed_records.len()
            + self.unindexed_notes.len()
    }
}

/// Compare file store and index enumerations without touching either.
pub fn diagnose(store: &FileStore, db: &IndexDb) -> Result<ConsistencyReport, DiagnoseError> {
    let listing = enumerate_store(store)?;
    let file_records: BTreeSet<String> = listing.records.into_iter().collect();
    let file_notes: BTreeSet<(String, String)> = listing.notes.into_iter().collect();

    let index_records: BTreeSet<String> = db.record_ids()?.into_iter().collect();
    let index_notes: BTreeSet<(String, String)> = db
        .note_ids()?
        .into_iter()
        .map(|(note_id, record_id)| (record_id, note_id))
        .collect();

    Ok(ConsistencyReport {
        orphaned_records: index_records.difference(&file_records).cloned().collect(),
        orphaned_notes: index_notes
            .difference(&file_notes)
            .map(|(_, note_id)| note_id.clone())
            .collect(),
        unindexed_records: file_records.difference(&index_records).cloned().collect(),
        unindexed_notes: file_notes
            .difference(&index_notes)
            .map(|(_, note_id)| note_id.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::HeaderFormat;
    use crate::index::builder::IndexBuilder;
    use tempfile::tempdir;

    fn record_text() -> String {
        "---\ntitle: T\ncreated_at: 2026-08-01T10:00:00Z\nauthor_handle: a\nauthor_email: a@x\n---\n\nB\n"
            .to_string()
    }

    #[test]
    fn clean_store_reports_clean() {
        let tmp = tempdir().unwrap();
        let store = FileStore::init(tmp.path()).unwrap();
        store.create_record("REC-00001", &record_text()).unwrap();

        let db = IndexDb::open_in_memory().unwrap();
        IndexBuilder::new(&db, &store, HeaderFormat::Yaml)
            .rebuild_all(None, None)
            .unwrap();

        let report = diagnose(&store, &db).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.drift_count(), 0);
    }

    #[test]
    fn unindexed_file_is_reported_not_repaired() {
        let tmp = tempdir().unwrap();
        let store = FileStore::init(tmp.path()).unwrap();
        store.create_record("REC-00001", &record_text()).unwrap();

        let db = IndexDb::open_in_memory().unwrap();
        let report = diagnose(&store, &db).unwrap();
        assert_eq!(report.unindexed_records, vec!["REC-00001".to_string()]);
        // Diagnose must not have indexed anything.
        assert_eq!(db.count_records().unwrap(), 0);
    }

    #[test]
    fn orphaned_row_is_reported() {
        let tmp = tempdir().unwrap();
        let store = FileStore::init(tmp.path()).unwrap();
        store.create_record("REC-00001", &record_text()).unwrap();

        let db = IndexDb::open_in_memory().unwrap();
        IndexBuilder::new(&db, &store, HeaderFormat::Yaml)
            .rebuild_all(None, None)
            .unwrap();

        store.delete_record("REC-00001").unwrap();
        let report = diagnose(&store, &db).unwrap();
        assert_eq!(report.orphaned_records, vec!["REC-00001".to_string()]);
        assert!(report.unindexed_records.is_empty());
    }
}

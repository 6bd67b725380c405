//! casefile-core: file-first record tracking with a rebuildable index.
//!
//! Documents (records and their notes) live as individual text files with a
//! structured metadata header; a colocated SQLite index accelerates search
//! and listing. The files are the only source of truth — the index is a
//! disposable projection that [`Tracker::rebuild_index`] reconstructs from
//! the files alone.

pub mod config;
pub mod frontmatter;
pub mod identity;
pub mod ids;
pub mod index;
pub mod kv;
pub mod model;
pub mod store;
pub mod tracker;

pub use identity::Identity;
pub use tracker::{RecordDraft, RecordPatch, Tracker, TrackerError, WriteOutcome};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

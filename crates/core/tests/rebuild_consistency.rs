//! Rebuild and diagnose: the index must always be reconstructible from the
//! files alone, and rebuilding must be deterministic.

use casefile_core::config::StoreConfig;
use casefile_core::frontmatter::HeaderFormat;
use casefile_core::ids::IdScheme;
use casefile_core::index::RecordQuery;
use casefile_core::kv::TypedKv;
use casefile_core::{Identity, RecordDraft, Tracker};
use tempfile::tempdir;

fn alice() -> Identity {
    Identity::new("alice", "alice@example.com")
}

fn seeded_tracker(tmp: &tempfile::TempDir) -> Tracker {
    let tracker = Tracker::init(
        tmp.path(),
        StoreConfig::new(HeaderFormat::Yaml, IdScheme::Sequential),
    )
    .unwrap();

    for (title, component) in [
        ("Fix login bug", "auth"),
        ("Update manual", "docs"),
        ("Ship release", "build"),
    ] {
        let mut kv = TypedKv::new();
        kv.strings.insert("component".into(), vec![component.into()]);
        tracker
            .create_record(
                RecordDraft {
                    title: title.into(),
                    body: format!("work on {component}\n"),
                    kv,
                    extra: vec![],
                },
                &alice(),
            )
            .unwrap();
    }
    tracker
        .add_note("REC-00001", "triaged", TypedKv::new(), &alice())
        .unwrap();
    tracker
}

#[test]
fn double_rebuild_is_identical_and_matches_incremental() {
    let tmp = tempdir().unwrap();
    let tracker = seeded_tracker(&tmp);

    let incremental = tracker.list_records(&RecordQuery::default()).unwrap();

    tracker.rebuild_index(None).unwrap();
    let first = tracker.list_records(&RecordQuery::default()).unwrap();

    tracker.rebuild_index(None).unwrap();
    let second = tracker.list_records(&RecordQuery::default()).unwrap();

    assert_eq!(first, second);
    assert_eq!(incremental, first);
    assert!(tracker.diagnose().unwrap().is_clean());
}

#[test]
fn rebuild_heals_a_hand_dropped_index() {
    let tmp = tempdir().unwrap();
    let tracker = seeded_tracker(&tmp);
    drop(tracker);

    // Losing the index entirely must lose nothing.
    std::fs::remove_file(tmp.path().join("index.db")).unwrap();

    let tracker = Tracker::open(tmp.path()).unwrap();
    let report = tracker.diagnose().unwrap();
    assert_eq!(report.unindexed_records.len(), 3);
    assert_eq!(report.unindexed_notes.len(), 1);

    let stats = tracker.rebuild_index(None).unwrap();
    assert_eq!(stats.records_indexed, 3);
    assert_eq!(stats.notes_indexed, 1);
    assert!(tracker.diagnose().unwrap().is_clean());

    let rows = tracker
        .list_records(&RecordQuery {
            text: Some("LOGIN".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "REC-00001");
}

#[test]
fn hand_edited_broken_file_fails_parse_and_keeps_stale_row() {
    let tmp = tempdir().unwrap();
    let tracker = seeded_tracker(&tmp);

    // Remove the closing marker by hand.
    let path = tmp.path().join("records/REC-00002.md");
    let original = std::fs::read_to_string(&path).unwrap();
    let broken = original.replace("---\n\n", "");
    std::fs::write(&path, broken).unwrap();

    let err = tracker.get_record("REC-00002").unwrap_err();
    assert_eq!(err.kind(), "format");

    // The index entry for that identifier is untouched by the failed read.
    let rows = tracker.list_records(&RecordQuery::default()).unwrap();
    assert!(rows.iter().any(|r| r.id == "REC-00002" && r.title == "Update manual"));

    // Rebuild skips the broken file and reports it.
    let stats = tracker.rebuild_index(None).unwrap();
    assert_eq!(stats.skipped, vec!["REC-00002".to_string()]);
    assert_eq!(stats.records_indexed, 2);
}

#[test]
fn search_ordering_is_modified_desc_id_asc() {
    let tmp = tempdir().unwrap();
    let tracker = seeded_tracker(&tmp);

    // Touch the oldest record so it becomes the most recently modified.
    tracker
        .update_record(
            "REC-00001",
            &casefile_core::RecordPatch {
                title: Some("Fix login bug again".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let rows = tracker.list_records(&RecordQuery::default()).unwrap();
    assert_eq!(rows[0].id, "REC-00001");

    // Case-insensitive search.
    let rows = tracker
        .list_records(&RecordQuery {
            text: Some("MANUAL".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "REC-00002");
}

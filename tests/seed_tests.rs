use std::path::PathBuf;

use tempfile::TempDir;

use vocab_backend_rust::db::operations::relations::{asymmetric_edges, RelationKind};
use vocab_backend_rust::db::operations::words::{count_words, find_word_by_text};
use vocab_backend_rust::seed::{seed_from_json, SeedError, SeedReport};
use vocab_backend_rust::services::vocabulary::word_detail;

mod common;

fn bundled_pack() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/seed_level4.json")
}

#[tokio::test]
async fn bundled_pack_imports_cleanly() {
    let store = common::create_test_db().await;
    let db = &store.db;

    let report = seed_from_json(db, &bundled_pack()).await.unwrap();
    assert_eq!(
        report,
        SeedReport {
            imported: 6,
            skipped: 0,
            failed: 0
        }
    );

    let abandon = find_word_by_text(db.pool(), "abandon").await.unwrap().unwrap();
    let detail = word_detail(db, abandon.id, None).await.unwrap().unwrap();
    assert_eq!(detail.prefixes[0].text, "ab-");
    assert_eq!(detail.synonyms.len(), 2);
    assert_eq!(detail.antonyms.len(), 2);

    for kind in [RelationKind::Synonym, RelationKind::Antonym] {
        assert!(asymmetric_edges(db.pool(), kind).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn reseeding_adds_no_words() {
    let store = common::create_test_db().await;
    let db = &store.db;

    seed_from_json(db, &bundled_pack()).await.unwrap();
    let before = count_words(db.pool()).await.unwrap();
    seed_from_json(db, &bundled_pack()).await.unwrap();

    assert_eq!(count_words(db.pool()).await.unwrap(), before);
}

#[tokio::test]
async fn bad_entries_are_counted_not_fatal() {
    let store = common::create_test_db().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pack.json");
    std::fs::write(
        &path,
        r#"[
            {"word": "harbor", "definition": "a sheltered port"},
            {"definition": "no text at all"},
            {"word": "   "},
            {"word": "echo", "relations": {"synonyms": ["Echo"]}},
            {"word": "anchor", "etymology": {"roots": [{"part": "anchor", "meaning": "hook"}]}}
        ]"#,
    )
    .unwrap();

    let report = seed_from_json(&store.db, &path).await.unwrap();
    assert_eq!(
        report,
        SeedReport {
            imported: 2,
            skipped: 2,
            failed: 1
        }
    );
    assert!(find_word_by_text(store.db.pool(), "echo").await.unwrap().is_none());
}

#[tokio::test]
async fn unreadable_pack_is_an_error() {
    let store = common::create_test_db().await;
    let dir = TempDir::new().unwrap();

    let missing = seed_from_json(&store.db, &dir.path().join("missing.json")).await;
    assert!(matches!(missing, Err(SeedError::Io(_))));

    let path = dir.path().join("object.json");
    std::fs::write(&path, r#"{"word": "not-an-array"}"#).unwrap();
    let malformed = seed_from_json(&store.db, &path).await;
    assert!(matches!(malformed, Err(SeedError::Json(_))));
}

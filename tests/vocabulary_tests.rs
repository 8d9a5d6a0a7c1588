use vocab_backend_rust::db::operations::relations::{AffixKind, RelationKind};
use vocab_backend_rust::db::operations::words::WordEntry;
use vocab_backend_rust::services::vocabulary::{
    add_to_list, edit_word, list_personal_words, random_word, remove_from_list, save_word,
    word_detail,
};
use vocab_backend_rust::services::word_graph::{AffixFact, RelationFact, WordFacts};
use vocab_backend_rust::services::ServiceError;

mod common;

#[tokio::test]
async fn saving_twice_keeps_one_list_entry() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "saver").await;

    let entry = WordEntry::text_only("persist");
    let first = save_word(db, &user, &entry, &WordFacts::default()).await.unwrap();
    let second = save_word(db, &user, &entry, &WordFacts::default()).await.unwrap();

    assert!(first.newly_added);
    assert!(!second.newly_added);
    assert_eq!(first.word_id, second.word_id);
    assert_eq!(list_personal_words(db, &user, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn shared_word_survives_removal_from_one_list() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let alice = common::create_user(db, "alice").await;
    let bob = common::create_user(db, "bob").await;

    let word = common::add_word(db, &alice, "shared").await;
    assert!(add_to_list(db, &bob, word).await.unwrap());

    remove_from_list(db, &alice, word).await.unwrap();
    assert!(list_personal_words(db, &alice, None).await.unwrap().is_empty());
    assert_eq!(list_personal_words(db, &bob, None).await.unwrap().len(), 1);

    let err = remove_from_list(db, &alice, word).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[tokio::test]
async fn unknown_word_cannot_be_listed() {
    let store = common::create_test_db().await;
    let user = common::create_user(&store.db, "ghost").await;

    let err = add_to_list(&store.db, &user, 4242).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[tokio::test]
async fn search_matches_text_and_definition() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "searcher").await;
    common::add_word(db, &user, "harbor").await;
    common::add_word(db, &user, "lantern").await;

    let by_text = list_personal_words(db, &user, Some("HARB")).await.unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].word.word, "harbor");

    let by_definition = list_personal_words(db, &user, Some("meaning of lan")).await.unwrap();
    assert_eq!(by_definition.len(), 1);
    assert_eq!(by_definition[0].word.word, "lantern");

    let blank = list_personal_words(db, &user, Some("   ")).await.unwrap();
    assert_eq!(blank.len(), 2);

    let literal = list_personal_words(db, &user, Some("%")).await.unwrap();
    assert!(literal.is_empty());
}

#[tokio::test]
async fn detail_carries_graph_and_progress() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "reader").await;

    let facts = WordFacts {
        affixes: vec![
            AffixFact {
                kind: AffixKind::Root,
                text: "port".into(),
                meaning: Some("carry".into()),
            },
            AffixFact {
                kind: AffixKind::Suffix,
                text: "-able".into(),
                meaning: Some("can be".into()),
            },
        ],
        relations: vec![
            RelationFact {
                kind: RelationKind::Synonym,
                other_word: "movable".into(),
            },
            RelationFact {
                kind: RelationKind::Antonym,
                other_word: "fixed".into(),
            },
        ],
    };
    let saved = save_word(db, &user, &WordEntry::text_only("portable"), &facts)
        .await
        .unwrap();

    let detail = word_detail(db, saved.word_id, Some(&user)).await.unwrap().unwrap();
    assert_eq!(detail.word.word, "portable");
    assert!(detail.prefixes.is_empty());
    assert_eq!(detail.roots[0].text, "port");
    assert_eq!(detail.suffixes[0].text, "-able");
    assert_eq!(detail.synonyms[0].word, "movable");
    assert_eq!(detail.antonyms[0].word, "fixed");
    assert_eq!(detail.progress.unwrap().review_count, 0);

    // The reverse edge is visible from the related word.
    let fixed = &detail.antonyms[0];
    let reverse = word_detail(db, fixed.id, None).await.unwrap().unwrap();
    assert_eq!(reverse.antonyms[0].word, "portable");
    assert!(reverse.progress.is_none());

    assert!(word_detail(db, 777_777, None).await.unwrap().is_none());
}

#[tokio::test]
async fn edit_rejects_taken_text_and_foreign_words() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "editor").await;
    let stranger = common::create_user(db, "stranger").await;
    common::add_word(db, &user, "taken").await;
    let word = common::add_word(db, &user, "draft").await;

    let renamed = WordEntry {
        definition: Some("a first version".into()),
        ..WordEntry::text_only("draught")
    };
    let updated = edit_word(db, &user, word, &renamed).await.unwrap();
    assert_eq!(updated.word, "draught");
    assert_eq!(updated.definition.as_deref(), Some("a first version"));
    assert!(updated.example1.is_none());

    let err = edit_word(db, &user, word, &WordEntry::text_only("TAKEN"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = edit_word(db, &user, word, &WordEntry::text_only(" "))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = edit_word(db, &stranger, word, &renamed).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[tokio::test]
async fn random_word_comes_from_the_list() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "lucky").await;

    let err = random_word(db, &user).await.unwrap_err();
    assert!(matches!(err, ServiceError::NoWordsAvailable));

    let word = common::add_word(db, &user, "only").await;
    assert_eq!(random_word(db, &user).await.unwrap().id, word);
}

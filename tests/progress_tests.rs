use vocab_backend_rust::db::operations::progress::get_progress;
use vocab_backend_rust::services::progress::{record_attempt, record_attempts};
use vocab_backend_rust::services::vocabulary::remove_from_list;
use vocab_backend_rust::services::ServiceError;

mod common;

#[tokio::test]
async fn correct_answers_move_both_counters() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "steady").await;
    let word = common::add_word(db, &user, "steady").await;

    for _ in 0..4 {
        record_attempt(db, &user, word, true).await.unwrap();
    }

    let progress = get_progress(db.pool(), &user, word).await.unwrap().unwrap();
    assert_eq!(progress.review_count, 4);
    assert_eq!(progress.correct_count, 4);
    assert!(progress.last_reviewed.is_some());
}

#[tokio::test]
async fn wrong_answer_only_moves_review_count() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "shaky").await;
    let word = common::add_word(db, &user, "shaky").await;
    record_attempt(db, &user, word, true).await.unwrap();

    let outcome = record_attempt(db, &user, word, false).await.unwrap();
    assert!(!outcome.is_correct);
    assert_eq!(outcome.word.id, word);
    assert_eq!(outcome.progress.review_count, 2);
    assert_eq!(outcome.progress.correct_count, 1);
}

#[tokio::test]
async fn word_outside_the_list_is_denied() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let owner = common::create_user(db, "owner").await;
    let other = common::create_user(db, "other").await;
    let word = common::add_word(db, &owner, "private").await;

    let err = record_attempt(db, &other, word, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));

    let err = record_attempt(db, &owner, 9_999, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[tokio::test]
async fn batch_with_a_foreign_word_records_nothing() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let owner = common::create_user(db, "owner").await;
    let other = common::create_user(db, "other").await;
    let mine = common::add_word(db, &owner, "mine").await;
    let theirs = common::add_word(db, &other, "theirs").await;

    let err = record_attempts(db, &owner, &[(mine, true), (theirs, true)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));

    let progress = get_progress(db.pool(), &owner, mine).await.unwrap().unwrap();
    assert_eq!(progress.review_count, 0);
    assert_eq!(progress.correct_count, 0);
}

#[tokio::test]
async fn batch_outcomes_follow_answer_order() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "batcher").await;
    let first = common::add_word(db, &user, "first").await;
    let second = common::add_word(db, &user, "second").await;

    let outcomes = record_attempts(db, &user, &[(second, false), (first, true), (second, true)])
        .await
        .unwrap();

    let ids: Vec<i64> = outcomes.iter().map(|o| o.word.id).collect();
    assert_eq!(ids, vec![second, first, second]);
    assert_eq!(outcomes[2].progress.review_count, 2);
    assert_eq!(outcomes[2].progress.correct_count, 1);
}

#[tokio::test]
async fn removed_word_is_denied_and_row_gone() {
    let store = common::create_test_db().await;
    let db = &store.db;
    let user = common::create_user(db, "leaver").await;
    let word = common::add_word(db, &user, "fleeting").await;

    remove_from_list(db, &user, word).await.unwrap();
    assert!(get_progress(db.pool(), &user, word).await.unwrap().is_none());

    let err = record_attempt(db, &user, word, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_lose_no_increments() {
    let store = common::create_test_db().await;
    let db = store.db.clone();
    let user = common::create_user(&db, "racer").await;
    let word = common::add_word(&db, &user, "race").await;

    let mut handles = Vec::new();
    for i in 0..24 {
        let db = db.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            record_attempt(&db, &user, word, i % 2 == 0).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let progress = get_progress(db.pool(), &user, word).await.unwrap().unwrap();
    assert_eq!(progress.review_count, 24);
    assert_eq!(progress.correct_count, 12);
}

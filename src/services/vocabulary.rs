use serde::Serialize;

use crate::db::operations::progress::{
    delete_progress, get_progress, insert_progress_if_absent, list_personal_words as query_personal_words,
    random_personal_word, PersonalWord, UserProgress,
};
use crate::db::operations::relations::{
    affixes_for_word, related_words, Affix, AffixKind, RelatedWord, RelationKind,
};
use crate::db::operations::words::{get_word, update_word, Word, WordEntry};
use crate::db::Database;
use crate::services::word_graph::{merge_word_facts, WordFacts};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDetail {
    #[serde(flatten)]
    pub word: Word,
    pub prefixes: Vec<Affix>,
    pub roots: Vec<Affix>,
    pub suffixes: Vec<Affix>,
    pub synonyms: Vec<RelatedWord>,
    pub antonyms: Vec<RelatedWord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<UserProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWord {
    pub word_id: i64,
    pub newly_added: bool,
}

/// Starts tracking a word. Returns false if it was already in the list.
pub async fn add_to_list(db: &Database, user_id: &str, word_id: i64) -> ServiceResult<bool> {
    if get_word(db.pool(), word_id).await?.is_none() {
        return Err(ServiceError::PermissionDenied);
    }
    let mut conn = db.pool().acquire().await?;
    let added = insert_progress_if_absent(&mut conn, user_id, word_id).await?;
    if added {
        tracing::info!(user_id, word_id, "word added to list");
    }
    Ok(added)
}

/// Drops the user's progress row; the shared word stays.
pub async fn remove_from_list(db: &Database, user_id: &str, word_id: i64) -> ServiceResult<()> {
    if !delete_progress(db.pool(), user_id, word_id).await? {
        return Err(ServiceError::PermissionDenied);
    }
    tracing::info!(user_id, word_id, "word removed from list");
    Ok(())
}

pub async fn save_word(
    db: &Database,
    user_id: &str,
    entry: &WordEntry,
    facts: &WordFacts,
) -> ServiceResult<SavedWord> {
    let word_id = merge_word_facts(db, entry, facts).await?;
    let newly_added = add_to_list(db, user_id, word_id).await?;
    Ok(SavedWord {
        word_id,
        newly_added,
    })
}

pub async fn list_personal_words(
    db: &Database,
    user_id: &str,
    query: Option<&str>,
) -> ServiceResult<Vec<PersonalWord>> {
    Ok(query_personal_words(db.pool(), user_id, query).await?)
}

/// The word with its affixes and relations. `progress` is filled when the
/// given user has the word in their list.
pub async fn word_detail(
    db: &Database,
    word_id: i64,
    user_id: Option<&str>,
) -> ServiceResult<Option<WordDetail>> {
    let pool = db.pool();
    let Some(word) = get_word(pool, word_id).await? else {
        return Ok(None);
    };

    let progress = match user_id {
        Some(user_id) => get_progress(pool, user_id, word_id).await?,
        None => None,
    };

    Ok(Some(WordDetail {
        word,
        prefixes: affixes_for_word(pool, AffixKind::Prefix, word_id).await?,
        roots: affixes_for_word(pool, AffixKind::Root, word_id).await?,
        suffixes: affixes_for_word(pool, AffixKind::Suffix, word_id).await?,
        synonyms: related_words(pool, RelationKind::Synonym, word_id).await?,
        antonyms: related_words(pool, RelationKind::Antonym, word_id).await?,
        progress,
    }))
}

/// Rewrites the shared entry of a word in the user's list.
pub async fn edit_word(
    db: &Database,
    user_id: &str,
    word_id: i64,
    entry: &WordEntry,
) -> ServiceResult<Word> {
    if entry.word.trim().is_empty() {
        return Err(ServiceError::Validation("word text must not be empty".into()));
    }
    if get_progress(db.pool(), user_id, word_id).await?.is_none() {
        return Err(ServiceError::PermissionDenied);
    }

    let mut tx = db.pool().begin().await?;
    let updated = match update_word(&mut tx, word_id, entry).await {
        Ok(updated) => updated,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(ServiceError::Validation(format!(
                "'{}' already exists",
                entry.word.trim()
            )));
        }
        Err(err) => return Err(err.into()),
    };
    if !updated {
        return Err(ServiceError::PermissionDenied);
    }
    tx.commit().await?;

    tracing::info!(user_id, word_id, "word edited");
    get_word(db.pool(), word_id)
        .await?
        .ok_or(ServiceError::PermissionDenied)
}

pub async fn random_word(db: &Database, user_id: &str) -> ServiceResult<Word> {
    random_personal_word(db.pool(), user_id)
        .await?
        .ok_or(ServiceError::NoWordsAvailable)
}

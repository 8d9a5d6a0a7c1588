//! Weak-word selection.
//!
//! Ranking happens in SQL (`rank_weak_words`); the random draw over the
//! ranked pool happens here, so the two can be tested separately.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::Serialize;

use crate::db::operations::progress::{rank_weak_words, RankedWord};
use crate::db::operations::words::Word;
use crate::db::Database;
use crate::services::{ServiceError, ServiceResult};

pub const DEFAULT_POOL_SIZE: usize = 10;
pub const STORY_POOL_SIZE: usize = 20;
pub const STORY_MIN_WORDS: usize = 3;
pub const STORY_MAX_WORDS: usize = 5;

/// Words for one multi-word cloze round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPool {
    /// Selection order.
    pub words: Vec<Word>,
    /// Same words, independently shuffled for display.
    pub word_bank: Vec<String>,
}

pub async fn select_next_word(
    db: &Database,
    user_id: &str,
    pool_size: usize,
) -> ServiceResult<Word> {
    let pool = rank_weak_words(db.pool(), user_id, pool_size.max(1) as i64).await?;
    let mut rng = rand::rng();
    let picked = pick_uniform(&pool, &mut rng).ok_or(ServiceError::NoWordsAvailable)?;

    tracing::debug!(
        user_id,
        word_id = picked.word.id,
        pool = pool.len(),
        "selected next review word"
    );
    Ok(picked.word.clone())
}

pub async fn select_multi_word_pool(db: &Database, user_id: &str) -> ServiceResult<StoryPool> {
    select_multi_word_pool_with(db, user_id, STORY_POOL_SIZE).await
}

pub async fn select_multi_word_pool_with(
    db: &Database,
    user_id: &str,
    pool_size: usize,
) -> ServiceResult<StoryPool> {
    let pool = rank_weak_words(db.pool(), user_id, pool_size.max(STORY_MIN_WORDS) as i64).await?;
    let words: Vec<Word> = pool.into_iter().map(|ranked| ranked.word).collect();

    let mut rng = rand::rng();
    let chosen = sample_story_words(&words, &mut rng).ok_or(ServiceError::InsufficientWords {
        required: STORY_MIN_WORDS,
        available: words.len(),
    })?;

    let word_bank = shuffled_bank(&chosen, &mut rng);
    Ok(StoryPool {
        words: chosen,
        word_bank,
    })
}

/// Uniform draw from an already ranked pool. `None` for an empty pool.
pub fn pick_uniform<'a, R: Rng + ?Sized>(
    pool: &'a [RankedWord],
    rng: &mut R,
) -> Option<&'a RankedWord> {
    pool.choose(rng)
}

/// Draws between 3 and `min(5, pool.len())` distinct words. `None` when the
/// pool holds fewer than 3.
pub fn sample_story_words<T: Clone, R: Rng + ?Sized>(pool: &[T], rng: &mut R) -> Option<Vec<T>> {
    if pool.len() < STORY_MIN_WORDS {
        return None;
    }
    let upper = STORY_MAX_WORDS.min(pool.len());
    let count = rng.random_range(STORY_MIN_WORDS..=upper);
    Some(pool.choose_multiple(rng, count).cloned().collect())
}

fn shuffled_bank<R: Rng + ?Sized>(words: &[Word], rng: &mut R) -> Vec<String> {
    let mut bank: Vec<String> = words.iter().map(|w| w.word.clone()).collect();
    bank.shuffle(rng);
    bank
}

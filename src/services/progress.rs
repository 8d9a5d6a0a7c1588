use serde::Serialize;

use crate::db::operations::progress::{increment_progress, UserProgress};
use crate::db::operations::words::{get_word, Word};
use crate::db::Database;
use crate::services::{ServiceError, ServiceResult};

const BLANK: &str = "_____";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub is_correct: bool,
    pub word: Word,
    pub progress: UserProgress,
}

/// Records one quiz answer for a word in the user's list.
///
/// The counters move in a single relative `UPDATE` so concurrent attempts on
/// the same row serialize in the store and none is lost.
pub async fn record_attempt(
    db: &Database,
    user_id: &str,
    word_id: i64,
    is_correct: bool,
) -> ServiceResult<AttemptOutcome> {
    record_attempts(db, user_id, &[(word_id, is_correct)])
        .await?
        .pop()
        .ok_or(ServiceError::PermissionDenied)
}

/// Records a batch of `(word_id, is_correct)` answers in one transaction.
/// If any word is missing from the user's list nothing is written.
pub async fn record_attempts(
    db: &Database,
    user_id: &str,
    attempts: &[(i64, bool)],
) -> ServiceResult<Vec<AttemptOutcome>> {
    let mut tx = db.pool().begin().await?;
    let mut recorded = Vec::with_capacity(attempts.len());
    for &(word_id, is_correct) in attempts {
        let progress = increment_progress(&mut tx, user_id, word_id, is_correct)
            .await?
            .ok_or(ServiceError::PermissionDenied)?;
        recorded.push((progress, is_correct));
    }
    tx.commit().await?;

    let mut outcomes = Vec::with_capacity(recorded.len());
    for (progress, is_correct) in recorded {
        let word = get_word(db.pool(), progress.word_id)
            .await?
            .ok_or(ServiceError::PermissionDenied)?;
        tracing::info!(
            user_id,
            word_id = word.id,
            is_correct,
            review_count = progress.review_count,
            correct_count = progress.correct_count,
            "attempt recorded"
        );
        outcomes.push(AttemptOutcome {
            is_correct,
            word,
            progress,
        });
    }
    Ok(outcomes)
}

pub fn check_cloze_answer(guess: &str, word: &str) -> bool {
    let guess = guess.trim();
    !guess.is_empty() && guess.to_lowercase() == word.trim().to_lowercase()
}

/// Blanks every case-insensitive whole-word occurrence of `word` in
/// `example` and drops `**` emphasis markers.
pub fn cloze_sentence(example: &str, word: &str) -> String {
    let cleaned = example.replace("**", "");
    let matches = whole_word_matches(&cleaned, word);

    let mut out = String::with_capacity(cleaned.len());
    let mut cursor = 0;
    for (start, end) in matches {
        out.push_str(&cleaned[cursor..start]);
        out.push_str(BLANK);
        cursor = end;
    }
    out.push_str(&cleaned[cursor..]);
    out
}

/// Blanks several words in one text, longest first, so a short word never
/// eats into a longer one that contains it.
pub fn cloze_words<S: AsRef<str>>(text: &str, words: &[S]) -> String {
    let mut ordered: Vec<&str> = words.iter().map(|w| w.as_ref()).collect();
    ordered.sort_by_key(|w| std::cmp::Reverse(w.trim().chars().count()));
    ordered
        .into_iter()
        .fold(text.to_string(), |story, word| cloze_sentence(&story, word))
}

fn mentions_word(text: &str, word: &str) -> bool {
    !whole_word_matches(text, word).is_empty()
}

/// Byte ranges where `word` appears bounded by non-alphanumeric characters.
fn whole_word_matches(text: &str, word: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = word.trim().chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map_or(text.len(), |(b, _)| *b);
    let is_word_char = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_alphanumeric());

    let mut found = Vec::new();
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        let hit = (i == 0 || !is_word_char(i - 1))
            && !is_word_char(i + needle.len())
            && needle
                .iter()
                .zip(&chars[i..])
                .all(|(n, (_, c))| n.to_lowercase().eq(c.to_lowercase()));
        if hit {
            found.push((byte_at(i), byte_at(i + needle.len())));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    found
}

/// Cloze text for a word: the first example that mentions it, or a
/// definition prompt when none does.
pub fn cloze_for_word(word: &Word) -> String {
    [&word.example1, &word.example2]
        .into_iter()
        .flatten()
        .find(|example| mentions_word(&example.replace("**", ""), &word.word))
        .map(|example| cloze_sentence(example, &word.word))
        .unwrap_or_else(|| match &word.definition {
            Some(definition) => format!("{BLANK}: {definition}"),
            None => BLANK.to_string(),
        })
}

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::progress::UserProgress;
use crate::db::operations::words::{get_word, Word};
use crate::response::{ok, AppError};
use crate::services::enrichment::{
    explain_wrong_answer, generate_story, sentence_feedback, SentenceFeedback,
};
use crate::services::progress::{
    check_cloze_answer, cloze_for_word, cloze_words, record_attempt, record_attempts,
};
use crate::services::selector::{select_multi_word_pool_with, select_next_word};
use crate::services::vocabulary::random_word;
use crate::services::{ServiceError, ServiceResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClozeQuestion {
    word: Word,
    cloze: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClozeAnswer {
    word_id: i64,
    guess: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClozeVerdict {
    is_correct: bool,
    correct_word: Word,
    user_guess: String,
    progress: UserProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum StorySource {
    Llm,
    Examples,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryQuestion {
    story: String,
    word_ids: Vec<i64>,
    word_bank: Vec<String>,
    source: StorySource,
}

#[derive(Debug, Deserialize)]
struct StoryAnswers {
    answers: Vec<ClozeAnswer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryVerdict {
    correct: usize,
    total: usize,
    results: Vec<ClozeVerdict>,
}

#[derive(Debug, Deserialize)]
struct SentenceAnswer {
    word: String,
    sentence: String,
}

#[derive(Debug, Serialize)]
struct SentenceVerdict {
    word: String,
    sentence: String,
    feedback: SentenceFeedback,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/next-word", get(next_word))
        .route("/check-cloze", post(check_cloze))
        .route("/story", get(story))
        .route("/check-story", post(check_story))
        .route("/sentence", get(sentence))
        .route("/check-sentence", post(check_sentence))
}

async fn next_word(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let word = select_next_word(state.db(), &user.id, state.config().review_pool_size).await?;
    let cloze = cloze_for_word(&word);
    Ok(ok(ClozeQuestion { word, cloze }))
}

async fn check_cloze(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(answer): Json<ClozeAnswer>,
) -> Result<impl IntoResponse, AppError> {
    let verdict = grade_answer(&state, &user.id, answer).await?;
    Ok(ok(verdict))
}

async fn story(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let pool = select_multi_word_pool_with(state.db(), &user.id, state.config().story_pool_size).await?;
    let texts: Vec<String> = pool.words.iter().map(|w| w.word.clone()).collect();

    let (raw_story, source) = match generate_story(state.llm(), &texts).await {
        Ok(story) => (story, StorySource::Llm),
        Err(ServiceError::Enrichment(reason)) => {
            tracing::warn!(%reason, "story generation degraded to examples");
            (fallback_story(&pool.words), StorySource::Examples)
        }
        Err(err) => return Err(err.into()),
    };

    let story = cloze_words(&raw_story, &texts);

    Ok(ok(StoryQuestion {
        story,
        word_ids: pool.words.iter().map(|w| w.id).collect(),
        word_bank: pool.word_bank,
        source,
    }))
}

/// Grades every blank without explanations. Attempts are recorded together
/// only after every answer names a word in the user's list.
async fn check_story(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<StoryAnswers>,
) -> Result<impl IntoResponse, AppError> {
    if payload.answers.is_empty() {
        return Err(AppError::validation("answers must not be empty"));
    }

    let mut graded = Vec::with_capacity(payload.answers.len());
    for answer in payload.answers {
        let word = get_word(state.db().pool(), answer.word_id)
            .await?
            .ok_or(ServiceError::PermissionDenied)?;
        let is_correct = check_cloze_answer(&answer.guess, &word.word);
        graded.push((answer.guess, word.id, is_correct));
    }

    let attempts: Vec<(i64, bool)> = graded
        .iter()
        .map(|(_, id, is_correct)| (*id, *is_correct))
        .collect();
    let outcomes = record_attempts(state.db(), &user.id, &attempts).await?;

    let results: Vec<ClozeVerdict> = graded
        .into_iter()
        .zip(outcomes)
        .map(|((guess, _, _), outcome)| ClozeVerdict {
            is_correct: outcome.is_correct,
            correct_word: outcome.word,
            user_guess: guess,
            progress: outcome.progress,
            explanation: None,
        })
        .collect();
    let correct = results.iter().filter(|r| r.is_correct).count();

    Ok(ok(StoryVerdict {
        correct,
        total: results.len(),
        results,
    }))
}

async fn sentence(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let word = random_word(state.db(), &user.id).await?;
    Ok(ok(word))
}

async fn check_sentence(
    State(state): State<AppState>,
    Json(answer): Json<SentenceAnswer>,
) -> Result<impl IntoResponse, AppError> {
    let word = answer.word.trim();
    let sentence = answer.sentence.trim();
    if word.is_empty() || sentence.is_empty() {
        return Err(AppError::validation("word and sentence must not be empty"));
    }

    let feedback = sentence_feedback(state.llm(), word, sentence).await?;
    Ok(ok(SentenceVerdict {
        word: word.to_string(),
        sentence: sentence.to_string(),
        feedback,
    }))
}

async fn grade_answer(
    state: &AppState,
    user_id: &str,
    answer: ClozeAnswer,
) -> ServiceResult<ClozeVerdict> {
    let word = get_word(state.db().pool(), answer.word_id)
        .await?
        .ok_or(ServiceError::PermissionDenied)?;
    let is_correct = check_cloze_answer(&answer.guess, &word.word);

    let outcome = record_attempt(state.db(), user_id, word.id, is_correct).await?;

    let explanation = if !is_correct {
        let context = cloze_for_word(&outcome.word);
        Some(explain_wrong_answer(state.llm(), &outcome.word, &answer.guess, &context).await)
    } else {
        None
    };

    Ok(ClozeVerdict {
        is_correct,
        correct_word: outcome.word,
        user_guess: answer.guess,
        progress: outcome.progress,
        explanation,
    })
}

/// One sentence per word from stored examples, or a definition line.
fn fallback_story(words: &[Word]) -> String {
    words
        .iter()
        .map(|word| {
            word.example1
                .clone()
                .or_else(|| word.example2.clone())
                .unwrap_or_else(|| match &word.definition {
                    Some(definition) => format!("{} means {}.", word.word, definition),
                    None => format!("Use {} in a sentence.", word.word),
                })
                .replace("**", "")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, example: Option<&str>, definition: Option<&str>) -> Word {
        Word {
            id: 1,
            word: text.into(),
            level: None,
            part_of_speech: None,
            definition: definition.map(Into::into),
            collocation: None,
            mnemonic: None,
            example1: example.map(Into::into),
            example2: None,
        }
    }

    #[test]
    fn fallback_story_uses_examples_then_definitions() {
        let words = vec![
            word("brisk", Some("A **brisk** walk."), None),
            word("candid", None, Some("truthful")),
        ];
        assert_eq!(
            fallback_story(&words),
            "A brisk walk. candid means truthful."
        );
    }
}

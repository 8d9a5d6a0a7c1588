use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::words::WordEntry;
use crate::response::{created, ok, AppError};
use crate::services::enrichment::{
    contains_cjk, lookup_word, suggest_english_words, LookupResult, Suggestion, LOOKUP_FAILED,
};
use crate::services::vocabulary::{
    edit_word, list_personal_words, remove_from_list, save_word, word_detail,
};
use crate::services::word_graph::WordFacts;
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    word: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveWordRequest {
    #[serde(flatten)]
    entry: WordEntry,
    #[serde(default)]
    facts: WordFacts,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum LookupResponse {
    Word(LookupResult),
    Suggestions {
        query: String,
        suggestions: Vec<Suggestion>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/lookup", post(lookup))
        .route("/save", post(save))
        .route("/:id", get(detail).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let words = list_personal_words(state.db(), &user.id, params.query.as_deref()).await?;
    Ok(ok(words))
}

/// Manual add: the entry and its facts go straight into the graph.
async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SaveWordRequest>,
) -> Result<Response, AppError> {
    let saved = save_word(state.db(), &user.id, &payload.entry, &payload.facts).await?;
    Ok(created(saved).into_response())
}

/// Chinese input gets English suggestions; anything else a word lookup.
/// A failed generator call still answers 200 with "lookup failed" fields.
async fn lookup(
    State(state): State<AppState>,
    Json(payload): Json<LookupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let query = payload.word.trim();
    if query.is_empty() {
        return Err(AppError::validation("word must not be empty"));
    }

    if contains_cjk(query) {
        let (suggestions, error) = match suggest_english_words(state.llm(), query).await {
            Ok(suggestions) => (suggestions, None),
            Err(ServiceError::Enrichment(reason)) => {
                tracing::warn!(query = %query, %reason, "reverse lookup degraded");
                (Vec::new(), Some(LOOKUP_FAILED.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        return Ok(ok(LookupResponse::Suggestions {
            query: query.to_string(),
            suggestions,
            error,
        }));
    }

    let result = match lookup_word(state.db(), state.llm(), query).await {
        Ok(result) => result,
        Err(ServiceError::Enrichment(reason)) => {
            tracing::warn!(word = %query, %reason, "lookup degraded");
            LookupResult::failed(query)
        }
        Err(err) => return Err(err.into()),
    };
    Ok(ok(LookupResponse::Word(result)))
}

/// Confirms a lookup result into the user's list.
async fn save(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SaveWordRequest>,
) -> Result<Response, AppError> {
    if payload.entry.definition.as_deref() == Some(LOOKUP_FAILED) {
        return Err(AppError::validation("a failed lookup cannot be saved"));
    }
    let saved = save_word(state.db(), &user.id, &payload.entry, &payload.facts).await?;
    Ok(created(saved).into_response())
}

async fn detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = word_detail(state.db(), id, Some(&user.id))
        .await?
        .ok_or_else(|| AppError::not_found("word not found"))?;
    Ok(ok(detail))
}

async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(entry): Json<WordEntry>,
) -> Result<impl IntoResponse, AppError> {
    let word = edit_word(state.db(), &user.id, id, &entry).await?;
    Ok(ok(word))
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    remove_from_list(state.db(), &user.id, id).await?;
    Ok(ok(serde_json::json!({ "wordId": id, "removed": true })))
}

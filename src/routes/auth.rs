use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{
    auth_cookie_header, clear_auth_cookie_header, extract_token, hash_token, sign_jwt_for_user,
    AuthUser,
};
use crate::db::operations::user::{
    delete_session_by_token_hash, find_user_by_username, insert_session, insert_user,
};
use crate::middleware::auth::require_auth;
use crate::response::{created, ok, AppError};
use crate::state::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;
const BCRYPT_COST: u32 = 10;

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionData {
    user: AuthUser,
    token: String,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Response, AppError> {
    let username = payload.username.trim();
    validate_credentials(username, &payload.password)?;

    if find_user_by_username(state.db().pool(), username)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("username is already taken"));
    }

    let password = payload.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .map_err(|err| {
            tracing::warn!(error = %err, "password hash failed");
            AppError::internal(err.to_string())
        })?;

    let user = match insert_user(state.db().pool(), username, &password_hash).await {
        Ok(user) => user,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::conflict("username is already taken"));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(created(AuthUser::from(user)).into_response())
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Response, AppError> {
    let invalid = || AppError::unauthorized("invalid username or password");

    let user = find_user_by_username(state.db().pool(), payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    let password = payload.password.clone();
    let stored_hash = user.password_hash.clone();
    let password_ok =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored_hash).unwrap_or(false))
            .await
            .unwrap_or(false);
    if !password_ok {
        return Err(invalid());
    }

    let (token, expires_at) = sign_jwt_for_user(state.auth(), &user.id).map_err(|err| {
        tracing::warn!(error = %err, "jwt sign failed");
        AppError::internal(err.to_string())
    })?;
    insert_session(state.db().pool(), &user.id, &hash_token(&token), expires_at).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    let mut headers = HeaderMap::new();
    if let Some(cookie) = auth_cookie_header(&token, state.auth().expires_in_ms / 1000) {
        headers.insert(header::SET_COOKIE, cookie);
    }

    let data = SessionData {
        user: user.into(),
        token,
    };
    Ok((StatusCode::OK, headers, ok(data)).into_response())
}

/// Idempotent: a missing or unknown token still clears the cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = extract_token(&headers) {
        delete_session_by_token_hash(state.db().pool(), &hash_token(&token)).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_auth_cookie_header());
    Ok((StatusCode::OK, response_headers, ok(serde_json::json!({ "loggedOut": true }))).into_response())
}

async fn me(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    ok(user)
}

fn validate_credentials(username: &str, password: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::validation(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(AppError::validation(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_bounds() {
        assert!(validate_credentials("bob", "12345678").is_ok());
        assert!(validate_credentials("bo", "12345678").is_err());
        assert!(validate_credentials(&"x".repeat(33), "12345678").is_err());
        assert!(validate_credentials("bobby", "short").is_err());
    }
}

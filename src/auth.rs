use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::format_naive_iso;
use crate::db::operations::user::{find_session, find_user_by_id, UserRecord};
use crate::db::Database;

pub const AUTH_COOKIE_NAME: &str = "auth_token";
const DEFAULT_EXPIRES_IN: &str = "24h";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl From<UserRecord> for AuthUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: format_naive_iso(user.created_at),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid JWT_EXPIRES_IN")]
    InvalidExpiresIn,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub expires_in_ms: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("expires_in_ms", &self.expires_in_ms)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, expires_in_ms: i64) -> Self {
        Self {
            secret: secret.into(),
            expires_in_ms,
        }
    }

    /// Without `JWT_SECRET` a random secret is generated, so tokens do not
    /// survive a restart.
    pub fn from_env() -> Result<Self, AuthError> {
        let expires_in =
            std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| DEFAULT_EXPIRES_IN.to_string());
        let expires_in_ms = parse_expires_in_ms(&expires_in)?;

        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using an ephemeral signing secret");
                random_secret()
            }
        };

        Ok(Self::new(secret, expires_in_ms))
    }
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Signature, expiry, a live session row for the token hash, and the user.
pub async fn verify_request_token(
    db: &Database,
    config: &AuthConfig,
    token: &str,
) -> Result<AuthUser, AuthError> {
    let claims = verify_jwt_hs256(token, &config.secret)?;
    let session = find_session(db.pool(), &hash_token(token))
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if session.user_id != claims.user_id || session.expires_at < Utc::now().naive_utc() {
        return Err(AuthError::InvalidToken);
    }

    let user = find_user_by_id(db.pool(), &claims.user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    Ok(user.into())
}

#[derive(Debug, Clone)]
struct JwtClaims {
    user_id: String,
}

fn verify_jwt_hs256(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let decode = |part: &str| {
        URL_SAFE_NO_PAD
            .decode(part.as_bytes())
            .map_err(|_| AuthError::InvalidToken)
    };
    let header_json: serde_json::Value =
        serde_json::from_slice(&decode(header_b64)?).map_err(|_| AuthError::InvalidToken)?;
    if header_json.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
        return Err(AuthError::InvalidToken);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&decode(sig_b64)?)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload: serde_json::Value =
        serde_json::from_slice(&decode(payload_b64)?).map_err(|_| AuthError::InvalidToken)?;

    let now = Utc::now().timestamp();
    if payload
        .get("exp")
        .and_then(|v| v.as_i64())
        .is_some_and(|exp| now >= exp)
    {
        return Err(AuthError::InvalidToken);
    }

    let user_id = payload
        .get("userId")
        .and_then(|v| v.as_str())
        .ok_or(AuthError::InvalidToken)?
        .to_string();

    Ok(JwtClaims { user_id })
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns the token and its expiry.
pub fn sign_jwt_for_user(
    config: &AuthConfig,
    user_id: &str,
) -> Result<(String, NaiveDateTime), AuthError> {
    let issued_at = Utc::now();
    let exp = issued_at
        .checked_add_signed(chrono::Duration::milliseconds(config.expires_in_ms))
        .ok_or(AuthError::InvalidExpiresIn)?;

    let header_json = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
    let payload_json = serde_json::json!({
        "userId": user_id,
        "iat": issued_at.timestamp(),
        "exp": exp.timestamp(),
        "jti": uuid::Uuid::new_v4().to_string(),
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header_json.to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.to_string());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = HmacSha256::new_from_slice(config.secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok((format!("{signing_input}.{sig_b64}"), exp.naive_utc()))
}

pub fn parse_expires_in_ms(value: &str) -> Result<i64, AuthError> {
    let trimmed = value.trim();
    if trimmed.len() < 2 {
        return Err(AuthError::InvalidExpiresIn);
    }

    let (digits, unit) = trimmed.split_at(trimmed.len() - 1);
    let amount: i64 = digits.parse().map_err(|_| AuthError::InvalidExpiresIn)?;
    if amount <= 0 {
        return Err(AuthError::InvalidExpiresIn);
    }

    let unit_ms = match unit {
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        "d" => 24 * 60 * 60 * 1000,
        _ => return Err(AuthError::InvalidExpiresIn),
    };
    amount
        .checked_mul(unit_ms)
        .ok_or(AuthError::InvalidExpiresIn)
}

pub fn auth_cookie_header(token: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{AUTH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .ok()
}

pub fn clear_auth_cookie_header() -> HeaderValue {
    HeaderValue::from_static("auth_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_in_units() {
        assert_eq!(parse_expires_in_ms("30s").unwrap(), 30_000);
        assert_eq!(parse_expires_in_ms("24h").unwrap(), 86_400_000);
        assert!(parse_expires_in_ms("0h").is_err());
        assert!(parse_expires_in_ms("10w").is_err());
        assert!(parse_expires_in_ms("h").is_err());
    }

    #[test]
    fn signed_token_verifies_with_same_secret_only() {
        let config = AuthConfig::new("secret-a", 60_000);
        let (token, _) = sign_jwt_for_user(&config, "user-1").unwrap();
        assert_eq!(verify_jwt_hs256(&token, "secret-a").unwrap().user_id, "user-1");
        assert!(verify_jwt_hs256(&token, "secret-b").is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = AuthConfig::new("secret", 60_000);
        let (token, _) = sign_jwt_for_user(&config, "user-1").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"userId":"admin","exp":9999999999}"#);
        parts[1] = &forged;
        assert!(verify_jwt_hs256(&parts.join("."), "secret").is_err());
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; auth_token=cookie-tok"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-tok"));
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-tok"));

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers).as_deref(), Some("header-tok"));
    }
}

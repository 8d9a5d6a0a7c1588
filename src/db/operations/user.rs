use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: String,
    pub expires_at: NaiveDateTime,
}

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<UserRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "users" ("id", "username", "passwordHash", "createdAt", "updatedAt")
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(UserRecord {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "id", "username", "passwordHash", "createdAt", "updatedAt"
        FROM "users" WHERE "username" = ? LIMIT 1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_user).transpose()
}

pub async fn find_user_by_id(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "id", "username", "passwordHash", "createdAt", "updatedAt"
        FROM "users" WHERE "id" = ? LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_user).transpose()
}

pub async fn insert_session(
    pool: &SqlitePool,
    user_id: &str,
    token_hash: &str,
    expires_at: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "sessions" ("id", "userId", "token", "expiresAt", "createdAt")
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_session(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<SessionRecord>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT "userId", "expiresAt" FROM "sessions" WHERE "token" = ?"#)
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
    row.map(|r| -> Result<SessionRecord, sqlx::Error> {
        Ok(SessionRecord {
            user_id: r.try_get("userId")?,
            expires_at: r.try_get("expiresAt")?,
        })
    })
    .transpose()
}

pub async fn delete_session_by_token_hash(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM "sessions" WHERE "token" = ?"#)
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_expired_sessions(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "sessions" WHERE "expiresAt" < ?"#)
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn map_user(row: &SqliteRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("passwordHash")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

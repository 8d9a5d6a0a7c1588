use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::format_naive_iso;
use crate::db::operations::words::{map_word, Word, WORD_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub word_id: i64,
    pub review_count: i64,
    pub correct_count: i64,
    pub last_reviewed: Option<String>,
}

/// One row of the weak-word ranking: the word, its counters and the ratio
/// the ranking sorted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedWord {
    pub word: Word,
    pub review_count: i64,
    pub correct_count: i64,
    pub accuracy: f64,
    pub last_reviewed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalWord {
    #[serde(flatten)]
    pub word: Word,
    pub review_count: i64,
    pub correct_count: i64,
    pub last_reviewed: Option<String>,
}

/// Same expression the ranking query sorts on: an unreviewed row divides by 1.
pub fn accuracy_ratio(review_count: i64, correct_count: i64) -> f64 {
    let denominator = if review_count == 0 { 1 } else { review_count };
    correct_count as f64 / denominator as f64
}

/// The user's list ordered weakest first, bounded by `limit`.
///
/// Order: fewest reviews, then lowest accuracy, then stalest `lastReviewed`
/// with never-reviewed rows first. Deterministic apart from ties on all three
/// keys, which fall back to word id.
pub async fn rank_weak_words(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<RankedWord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {WORD_COLUMNS},
            p."reviewCount", p."correctCount", p."lastReviewed",
            CAST(p."correctCount" AS REAL)
                / CASE WHEN p."reviewCount" = 0 THEN 1 ELSE p."reviewCount" END AS "accuracy"
        FROM "user_word_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = ?
        ORDER BY p."reviewCount" ASC, "accuracy" ASC, p."lastReviewed" ASC NULLS FIRST, w."id" ASC
        LIMIT ?
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<RankedWord, sqlx::Error> {
            let last_reviewed: Option<NaiveDateTime> = row.try_get("lastReviewed")?;
            Ok(RankedWord {
                word: map_word(row)?,
                review_count: row.try_get("reviewCount")?,
                correct_count: row.try_get("correctCount")?,
                accuracy: row.try_get("accuracy")?,
                last_reviewed: last_reviewed.map(format_naive_iso),
            })
        })
        .collect()
}

/// Starts tracking a word for a user. Returns false if it was already listed.
pub async fn insert_progress_if_absent(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT OR IGNORE INTO "user_word_progress" ("userId", "wordId") VALUES (?, ?)"#,
    )
    .bind(user_id)
    .bind(word_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_progress(
    pool: &SqlitePool,
    user_id: &str,
    word_id: i64,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query(r#"DELETE FROM "user_word_progress" WHERE "userId" = ? AND "wordId" = ?"#)
            .bind(user_id)
            .bind(word_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_progress(
    pool: &SqlitePool,
    user_id: &str,
    word_id: i64,
) -> Result<Option<UserProgress>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "userId", "wordId", "reviewCount", "correctCount", "lastReviewed"
        FROM "user_word_progress"
        WHERE "userId" = ? AND "wordId" = ?
        "#,
    )
    .bind(user_id)
    .bind(word_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_progress).transpose()
}

/// Relative increment in one statement. `None` when the user has no row for
/// the word.
pub async fn increment_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    word_id: i64,
    is_correct: bool,
) -> Result<Option<UserProgress>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE "user_word_progress"
        SET "reviewCount" = "reviewCount" + 1,
            "correctCount" = "correctCount" + ?,
            "lastReviewed" = ?
        WHERE "userId" = ? AND "wordId" = ?
        RETURNING "userId", "wordId", "reviewCount", "correctCount", "lastReviewed"
        "#,
    )
    .bind(i64::from(is_correct))
    .bind(Utc::now().naive_utc())
    .bind(user_id)
    .bind(word_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(map_progress).transpose()
}

pub async fn list_personal_words(
    pool: &SqlitePool,
    user_id: &str,
    query: Option<&str>,
) -> Result<Vec<PersonalWord>, sqlx::Error> {
    let search = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));

    let sql = format!(
        r#"
        SELECT {WORD_COLUMNS}, p."reviewCount", p."correctCount", p."lastReviewed"
        FROM "user_word_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = ?1
          AND (?2 IS NULL
               OR w."word" LIKE ?2 ESCAPE '\'
               OR w."definition" LIKE ?2 ESCAPE '\'
               OR w."example1" LIKE ?2 ESCAPE '\'
               OR w."example2" LIKE ?2 ESCAPE '\')
        ORDER BY w."id" DESC
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(search)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<PersonalWord, sqlx::Error> {
            let last_reviewed: Option<NaiveDateTime> = row.try_get("lastReviewed")?;
            Ok(PersonalWord {
                word: map_word(row)?,
                review_count: row.try_get("reviewCount")?,
                correct_count: row.try_get("correctCount")?,
                last_reviewed: last_reviewed.map(format_naive_iso),
            })
        })
        .collect()
}

pub async fn random_personal_word(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Word>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {WORD_COLUMNS}
        FROM "user_word_progress" p
        JOIN "words" w ON w."id" = p."wordId"
        WHERE p."userId" = ?
        ORDER BY RANDOM()
        LIMIT 1
        "#
    );
    let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
    row.as_ref().map(map_word).transpose()
}

fn map_progress(row: &SqliteRow) -> Result<UserProgress, sqlx::Error> {
    let last_reviewed: Option<NaiveDateTime> = row.try_get("lastReviewed")?;
    Ok(UserProgress {
        user_id: row.try_get("userId")?,
        word_id: row.try_get("wordId")?,
        review_count: row.try_get("reviewCount")?,
        correct_count: row.try_get("correctCount")?,
        last_reviewed: last_reviewed.map(format_naive_iso),
    })
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreviewed_ratio_is_zero() {
        assert_eq!(accuracy_ratio(0, 0), 0.0);
    }

    #[test]
    fn unreviewed_ties_with_one_miss() {
        assert_eq!(accuracy_ratio(0, 0), accuracy_ratio(1, 0));
    }

    #[test]
    fn ratio_divides_by_reviews() {
        assert!((accuracy_ratio(4, 3) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }
}

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Canonical entry in the shared word store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub word: String,
    pub level: Option<i64>,
    pub part_of_speech: Option<String>,
    pub definition: Option<String>,
    pub collocation: Option<String>,
    pub mnemonic: Option<String>,
    pub example1: Option<String>,
    pub example2: Option<String>,
}

/// Field values for an upsert keyed on `word`. `None` keeps whatever is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordEntry {
    pub word: String,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub collocation: Option<String>,
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub example1: Option<String>,
    #[serde(default)]
    pub example2: Option<String>,
}

impl WordEntry {
    pub fn text_only(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }
}

pub(crate) const WORD_COLUMNS: &str = r#"w."id", w."word", w."level", w."partOfSpeech", w."definition",
    w."collocation", w."mnemonic", w."example1", w."example2""#;

pub async fn get_word(pool: &SqlitePool, word_id: i64) -> Result<Option<Word>, sqlx::Error> {
    let sql = format!(r#"SELECT {WORD_COLUMNS} FROM "words" w WHERE w."id" = ? LIMIT 1"#);
    let row = sqlx::query(&sql).bind(word_id).fetch_optional(pool).await?;
    row.as_ref().map(map_word).transpose()
}

pub async fn find_word_by_text(pool: &SqlitePool, text: &str) -> Result<Option<Word>, sqlx::Error> {
    let sql = format!(r#"SELECT {WORD_COLUMNS} FROM "words" w WHERE w."word" = ? LIMIT 1"#);
    let row = sqlx::query(&sql)
        .bind(text.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_word).transpose()
}

/// Insert-or-replace-fields keyed on the unique text. Returns the row id.
pub async fn upsert_word(conn: &mut SqliteConnection, entry: &WordEntry) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO "words" (
            "word", "level", "partOfSpeech", "definition", "collocation",
            "mnemonic", "example1", "example2"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("word") DO UPDATE SET
            "level" = COALESCE(excluded."level", "words"."level"),
            "partOfSpeech" = COALESCE(excluded."partOfSpeech", "words"."partOfSpeech"),
            "definition" = COALESCE(excluded."definition", "words"."definition"),
            "collocation" = COALESCE(excluded."collocation", "words"."collocation"),
            "mnemonic" = COALESCE(excluded."mnemonic", "words"."mnemonic"),
            "example1" = COALESCE(excluded."example1", "words"."example1"),
            "example2" = COALESCE(excluded."example2", "words"."example2")
        RETURNING "id"
        "#,
    )
    .bind(entry.word.trim())
    .bind(entry.level)
    .bind(&entry.part_of_speech)
    .bind(&entry.definition)
    .bind(&entry.collocation)
    .bind(&entry.mnemonic)
    .bind(&entry.example1)
    .bind(&entry.example2)
    .fetch_one(&mut *conn)
    .await
}

/// Text-only placeholder for a related word; existing rows are left untouched.
pub async fn ensure_placeholder_word(
    conn: &mut SqliteConnection,
    text: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query(r#"INSERT OR IGNORE INTO "words" ("word") VALUES (?)"#)
        .bind(text.trim())
        .execute(&mut *conn)
        .await?;

    sqlx::query_scalar(r#"SELECT "id" FROM "words" WHERE "word" = ?"#)
        .bind(text.trim())
        .fetch_one(&mut *conn)
        .await
}

/// Overwrites every field of an existing word. Returns false when the id is unknown.
pub async fn update_word(
    conn: &mut SqliteConnection,
    word_id: i64,
    entry: &WordEntry,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE "words"
        SET "word" = ?, "level" = ?, "partOfSpeech" = ?, "definition" = ?,
            "collocation" = ?, "mnemonic" = ?, "example1" = ?, "example2" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(entry.word.trim())
    .bind(entry.level)
    .bind(&entry.part_of_speech)
    .bind(&entry.definition)
    .bind(&entry.collocation)
    .bind(&entry.mnemonic)
    .bind(&entry.example1)
    .bind(&entry.example2)
    .bind(word_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_words(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(pool)
        .await
}

pub(crate) fn map_word(row: &SqliteRow) -> Result<Word, sqlx::Error> {
    Ok(Word {
        id: row.try_get("id")?,
        word: row.try_get("word")?,
        level: row.try_get("level")?,
        part_of_speech: row.try_get("partOfSpeech")?,
        definition: row.try_get("definition")?,
        collocation: row.try_get("collocation")?,
        mnemonic: row.try_get("mnemonic")?,
        example1: row.try_get("example1")?,
        example2: row.try_get("example2")?,
    })
}

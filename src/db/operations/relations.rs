use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffixKind {
    Prefix,
    Root,
    Suffix,
}

impl AffixKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Root => "root",
            Self::Suffix => "suffix",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Self::Prefix => "prefixes",
            Self::Root => "roots",
            Self::Suffix => "suffixes",
        }
    }

    fn junction_table(&self) -> &'static str {
        match self {
            Self::Prefix => "word_prefixes",
            Self::Root => "word_roots",
            Self::Suffix => "word_suffixes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Synonym,
    Antonym,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synonym => "synonym",
            Self::Antonym => "antonym",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Self::Synonym => "synonyms",
            Self::Antonym => "antonyms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affix {
    pub id: i64,
    pub text: String,
    pub meaning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedWord {
    pub id: i64,
    pub word: String,
}

/// Insert-if-absent keyed on the affix text. A stored meaning is kept; an
/// empty one is filled in. Returns the affix id.
pub async fn ensure_affix(
    conn: &mut SqliteConnection,
    kind: AffixKind,
    text: &str,
    meaning: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO "{table}" ("text", "meaning") VALUES (?, ?)
        ON CONFLICT ("text") DO UPDATE SET
            "meaning" = COALESCE("{table}"."meaning", excluded."meaning")
        RETURNING "id"
        "#,
        table = kind.table()
    );
    sqlx::query_scalar(&sql)
        .bind(text.trim())
        .bind(meaning.map(str::trim).filter(|m| !m.is_empty()))
        .fetch_one(&mut *conn)
        .await
}

pub async fn link_affix(
    conn: &mut SqliteConnection,
    kind: AffixKind,
    word_id: i64,
    affix_id: i64,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        r#"INSERT OR IGNORE INTO "{}" ("wordId", "affixId") VALUES (?, ?)"#,
        kind.junction_table()
    );
    sqlx::query(&sql)
        .bind(word_id)
        .bind(affix_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Writes both `(a, b)` and `(b, a)`. The only writer of relation edges.
pub async fn link_symmetric(
    conn: &mut SqliteConnection,
    kind: RelationKind,
    a: i64,
    b: i64,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        r#"INSERT OR IGNORE INTO "{}" ("word1Id", "word2Id") VALUES (?, ?), (?, ?)"#,
        kind.table()
    );
    sqlx::query(&sql)
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn affixes_for_word(
    pool: &SqlitePool,
    kind: AffixKind,
    word_id: i64,
) -> Result<Vec<Affix>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT a."id", a."text", a."meaning"
        FROM "{junction}" j
        JOIN "{table}" a ON a."id" = j."affixId"
        WHERE j."wordId" = ?
        ORDER BY a."id"
        "#,
        junction = kind.junction_table(),
        table = kind.table()
    );
    let rows = sqlx::query(&sql).bind(word_id).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<Affix, sqlx::Error> {
            Ok(Affix {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                meaning: row.try_get("meaning")?,
            })
        })
        .collect()
}

pub async fn related_words(
    pool: &SqlitePool,
    kind: RelationKind,
    word_id: i64,
) -> Result<Vec<RelatedWord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT w."id", w."word"
        FROM "{}" r
        JOIN "words" w ON w."id" = r."word2Id"
        WHERE r."word1Id" = ?
        ORDER BY w."word"
        "#,
        kind.table()
    );
    let rows = sqlx::query(&sql).bind(word_id).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<RelatedWord, sqlx::Error> {
            Ok(RelatedWord {
                id: row.try_get("id")?,
                word: row.try_get("word")?,
            })
        })
        .collect()
}

/// Edges `(a, b)` without a matching `(b, a)`. Empty for a healthy store.
pub async fn asymmetric_edges(
    pool: &SqlitePool,
    kind: RelationKind,
) -> Result<Vec<(i64, i64)>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT r."word1Id", r."word2Id"
        FROM "{table}" r
        WHERE NOT EXISTS (
            SELECT 1 FROM "{table}" m
            WHERE m."word1Id" = r."word2Id" AND m."word2Id" = r."word1Id"
        )
        "#,
        table = kind.table()
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<(i64, i64), sqlx::Error> {
            Ok((row.try_get("word1Id")?, row.try_get("word2Id")?))
        })
        .collect()
}

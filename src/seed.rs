use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::db::operations::relations::{AffixKind, RelationKind};
use crate::db::operations::words::WordEntry;
use crate::db::Database;
use crate::services::word_graph::{merge_word_facts, AffixFact, RelationFact, WordFacts};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file is not a JSON array of entries: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    #[serde(default)]
    word: Option<String>,
    #[serde(default)]
    level: Option<i64>,
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    collocation: Option<String>,
    #[serde(default)]
    mnemonic: Option<String>,
    #[serde(default)]
    example1: Option<String>,
    #[serde(default)]
    example2: Option<String>,
    #[serde(default)]
    etymology: SeedEtymology,
    #[serde(default)]
    relations: SeedRelations,
}

#[derive(Debug, Default, Deserialize)]
struct SeedEtymology {
    #[serde(default)]
    prefixes: Vec<SeedAffix>,
    #[serde(default)]
    roots: Vec<SeedAffix>,
    #[serde(default)]
    suffixes: Vec<SeedAffix>,
}

#[derive(Debug, Deserialize)]
struct SeedAffix {
    part: String,
    #[serde(default)]
    meaning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SeedRelations {
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

impl SeedEntry {
    fn into_parts(self, word: String) -> (WordEntry, WordFacts) {
        let entry = WordEntry {
            word,
            level: self.level,
            part_of_speech: self.part_of_speech,
            definition: self.definition,
            collocation: self.collocation,
            mnemonic: self.mnemonic,
            example1: self.example1,
            example2: self.example2,
        };

        let affixes = [
            (AffixKind::Prefix, self.etymology.prefixes),
            (AffixKind::Root, self.etymology.roots),
            (AffixKind::Suffix, self.etymology.suffixes),
        ]
        .into_iter()
        .flat_map(|(kind, list)| {
            list.into_iter().map(move |affix| AffixFact {
                kind,
                text: affix.part,
                meaning: affix.meaning,
            })
        })
        .collect();

        let relations = [
            (RelationKind::Synonym, self.relations.synonyms),
            (RelationKind::Antonym, self.relations.antonyms),
        ]
        .into_iter()
        .flat_map(|(kind, list)| {
            list.into_iter()
                .map(move |other_word| RelationFact { kind, other_word })
        })
        .collect();

        (entry, WordFacts { affixes, relations })
    }
}

/// Imports a JSON word pack through the regular merge path.
///
/// Entries without a `word` are skipped. A failing entry is logged and
/// counted; the remaining entries still import.
pub async fn seed_from_json(db: &Database, path: &Path) -> Result<SeedReport, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let entries: Vec<SeedEntry> = serde_json::from_str(&raw)?;

    tracing::info!(path = %path.display(), entries = entries.len(), "seeding word store");

    let mut report = SeedReport::default();
    for entry in entries {
        let Some(word) = entry
            .word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
        else {
            report.skipped += 1;
            continue;
        };

        let (word_entry, facts) = entry.into_parts(word);
        match merge_word_facts(db, &word_entry, &facts).await {
            Ok(_) => report.imported += 1,
            Err(err) => {
                tracing::warn!(word = %word_entry.word, error = %err, "seed entry failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        "seeding finished"
    );
    Ok(report)
}

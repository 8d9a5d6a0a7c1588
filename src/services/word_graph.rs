//! Merges a word and its etymology/relation facts into the shared graph.

use serde::{Deserialize, Serialize};

use crate::db::operations::relations::{ensure_affix, link_affix, link_symmetric, AffixKind, RelationKind};
use crate::db::operations::words::{ensure_placeholder_word, upsert_word, WordEntry};
use crate::db::Database;
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixFact {
    pub kind: AffixKind,
    pub text: String,
    #[serde(default)]
    pub meaning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationFact {
    pub kind: RelationKind,
    pub other_word: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordFacts {
    #[serde(default)]
    pub affixes: Vec<AffixFact>,
    #[serde(default)]
    pub relations: Vec<RelationFact>,
}

/// Upserts `entry` and links every fact, all in one transaction.
///
/// Every insert is keyed on a natural unique column, so repeating a call
/// with the same input adds no rows. Validation runs before the transaction
/// opens; a store error mid-way rolls the whole merge back.
pub async fn merge_word_facts(
    db: &Database,
    entry: &WordEntry,
    facts: &WordFacts,
) -> ServiceResult<i64> {
    validate(entry, facts)?;

    let mut tx = db.pool().begin().await?;
    let word_id = upsert_word(&mut tx, entry).await?;

    for affix in &facts.affixes {
        let affix_id = ensure_affix(&mut tx, affix.kind, &affix.text, affix.meaning.as_deref()).await?;
        link_affix(&mut tx, affix.kind, word_id, affix_id).await?;
    }

    for relation in &facts.relations {
        let other_id = ensure_placeholder_word(&mut tx, &relation.other_word).await?;
        link_symmetric(&mut tx, relation.kind, word_id, other_id).await?;
    }

    tx.commit().await?;

    tracing::debug!(
        word = %entry.word.trim(),
        word_id,
        affixes = facts.affixes.len(),
        relations = facts.relations.len(),
        "word facts merged"
    );
    Ok(word_id)
}

fn validate(entry: &WordEntry, facts: &WordFacts) -> ServiceResult<()> {
    let word = entry.word.trim();
    if word.is_empty() {
        return Err(ServiceError::Validation("word text must not be empty".into()));
    }
    if let Some(affix) = facts.affixes.iter().find(|a| a.text.trim().is_empty()) {
        return Err(ServiceError::Validation(format!(
            "{} text must not be empty",
            affix.kind.as_str()
        )));
    }
    for relation in &facts.relations {
        let other = relation.other_word.trim();
        if other.is_empty() {
            return Err(ServiceError::Validation(format!(
                "{} must not be empty",
                relation.kind.as_str()
            )));
        }
        if other.eq_ignore_ascii_case(word) {
            return Err(ServiceError::Validation(format!(
                "'{word}' cannot be its own {}",
                relation.kind.as_str()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_with(relations: Vec<RelationFact>, affixes: Vec<AffixFact>) -> WordFacts {
        WordFacts { affixes, relations }
    }

    #[test]
    fn blank_word_is_rejected() {
        let err = validate(&WordEntry::text_only("  "), &WordFacts::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn self_relation_is_rejected() {
        let facts = facts_with(
            vec![RelationFact {
                kind: RelationKind::Synonym,
                other_word: "Happy".into(),
            }],
            vec![],
        );
        let err = validate(&WordEntry::text_only("happy"), &facts).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn blank_affix_is_rejected() {
        let facts = facts_with(
            vec![],
            vec![AffixFact {
                kind: AffixKind::Root,
                text: " ".into(),
                meaning: None,
            }],
        );
        assert!(validate(&WordEntry::text_only("reject"), &facts).is_err());
    }

    #[test]
    fn facts_deserialize_from_camel_case() {
        let facts: WordFacts = serde_json::from_str(
            r#"{"affixes":[{"kind":"prefix","text":"re","meaning":"back"}],
                "relations":[{"kind":"antonym","otherWord":"accept"}]}"#,
        )
        .unwrap();
        assert_eq!(facts.affixes[0].kind, AffixKind::Prefix);
        assert_eq!(facts.relations[0].other_word, "accept");
    }
}

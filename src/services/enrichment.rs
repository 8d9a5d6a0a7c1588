//! Word lookup and quiz feedback backed by the text-generation provider.
//!
//! Every generator response is expected to be a JSON object. Anything else,
//! and any transport failure, surfaces as `ServiceError::Enrichment`; the
//! callers decide how to degrade.

use serde::{Deserialize, Serialize};

use crate::db::operations::relations::{AffixKind, RelationKind};
use crate::db::operations::words::{find_word_by_text, Word, WordEntry};
use crate::db::Database;
use crate::services::llm_provider::LlmProvider;
use crate::services::vocabulary::word_detail;
use crate::services::word_graph::{AffixFact, RelationFact, WordFacts};
use crate::services::{ServiceError, ServiceResult};

pub const LOOKUP_FAILED: &str = "lookup failed";
pub const EXPLANATION_UNAVAILABLE: &str = "No explanation is available right now.";
const MAX_SUGGESTIONS: usize = 5;

const WORD_INFO_SYSTEM: &str = "You are a lexicographer for English learners. Reply with one valid JSON object and nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Local,
    Llm,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub source: LookupSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_id: Option<i64>,
    pub entry: WordEntry,
    pub facts: WordFacts,
}

impl LookupResult {
    /// Payload shown when the generator could not be used.
    pub fn failed(text: &str) -> Self {
        Self {
            source: LookupSource::Failed,
            word_id: None,
            entry: WordEntry {
                word: text.trim().to_string(),
                definition: Some(LOOKUP_FAILED.to_string()),
                example1: Some(LOOKUP_FAILED.to_string()),
                ..WordEntry::default()
            },
            facts: WordFacts::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub word: String,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceFeedback {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, alias = "usage_ok")]
    pub usage_ok: bool,
}

#[derive(Debug, Deserialize)]
struct RawWordInfo {
    #[serde(default)]
    definition: Option<String>,
    #[serde(default, alias = "partOfSpeech")]
    part_of_speech: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    collocation: Option<String>,
    #[serde(default)]
    mnemonic: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
    #[serde(default)]
    etymology: RawEtymology,
}

#[derive(Debug, Default, Deserialize)]
struct RawEtymology {
    #[serde(default)]
    prefixes: Vec<RawAffix>,
    #[serde(default)]
    roots: Vec<RawAffix>,
    #[serde(default)]
    suffixes: Vec<RawAffix>,
}

#[derive(Debug, Deserialize)]
struct RawAffix {
    #[serde(alias = "prefix", alias = "root", alias = "suffix")]
    part: String,
    #[serde(default)]
    meaning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestions {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct RawStory {
    story: String,
}

/// Local store first; the generator only for words without a definition.
pub async fn lookup_word(db: &Database, llm: &LlmProvider, text: &str) -> ServiceResult<LookupResult> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::Validation("word text must not be empty".into()));
    }

    if let Some(local) = find_word_by_text(db.pool(), text).await? {
        if local.definition.is_some() {
            if let Some(result) = local_lookup(db, &local).await? {
                tracing::debug!(word = %local.word, "lookup served from store");
                return Ok(result);
            }
        }
    }

    let prompt = format!(
        r#"Analyze the English word "{text}". Return a JSON object with these keys:
"definition": (string) the most common definition,
"part_of_speech": (string),
"example": (string) one example sentence that uses the word,
"collocation": (string) a common collocation,
"mnemonic": (string) a short memory aid,
"synonyms": (array of strings) 2-3 common synonyms,
"antonyms": (array of strings) 1-2 common antonyms,
"etymology": {{ "prefixes": [{{"part": string, "meaning": string}}], "roots": [...], "suffixes": [...] }}"#
    );
    let raw = generate(llm, WORD_INFO_SYSTEM, &prompt).await?;
    let (entry, facts) = parse_word_info(text, &raw)?;

    Ok(LookupResult {
        source: LookupSource::Llm,
        word_id: None,
        entry,
        facts,
    })
}

async fn local_lookup(db: &Database, word: &Word) -> ServiceResult<Option<LookupResult>> {
    let Some(detail) = word_detail(db, word.id, None).await? else {
        return Ok(None);
    };

    let affixes = [
        (AffixKind::Prefix, &detail.prefixes),
        (AffixKind::Root, &detail.roots),
        (AffixKind::Suffix, &detail.suffixes),
    ]
    .into_iter()
    .flat_map(|(kind, list)| {
        list.iter().map(move |affix| AffixFact {
            kind,
            text: affix.text.clone(),
            meaning: affix.meaning.clone(),
        })
    })
    .collect();

    let relations = [
        (RelationKind::Synonym, &detail.synonyms),
        (RelationKind::Antonym, &detail.antonyms),
    ]
    .into_iter()
    .flat_map(|(kind, list)| {
        list.iter().map(move |related| RelationFact {
            kind,
            other_word: related.word.clone(),
        })
    })
    .collect();

    let word = detail.word;
    Ok(Some(LookupResult {
        source: LookupSource::Local,
        word_id: Some(word.id),
        entry: WordEntry {
            word: word.word,
            level: word.level,
            part_of_speech: word.part_of_speech,
            definition: word.definition,
            collocation: word.collocation,
            mnemonic: word.mnemonic,
            example1: word.example1,
            example2: word.example2,
        },
        facts: WordFacts { affixes, relations },
    }))
}

/// English candidates for a term written in Chinese.
pub async fn suggest_english_words(llm: &LlmProvider, term: &str) -> ServiceResult<Vec<Suggestion>> {
    let prompt = format!(
        r#"Suggest 3 to 5 distinct English words for the Chinese term "{}".
Return a JSON object with one key "suggestions": an array of objects with keys
"word" (the English word) and "hint" (a short note on its nuance or typical usage)."#,
        term.trim()
    );
    let raw = generate(llm, WORD_INFO_SYSTEM, &prompt).await?;
    parse_suggestions(&raw)
}

/// Never fails: a generator error becomes a fixed message.
pub async fn explain_wrong_answer(llm: &LlmProvider, word: &Word, guess: &str, sentence: &str) -> String {
    let prompt = format!(
        r#"A student reviewing the word "{}" (definition: {}) answered "{}" for the sentence: "{}".
Give a brief, friendly explanation that helps them remember the right word."#,
        word.word,
        word.definition.as_deref().unwrap_or("unknown"),
        guess.trim(),
        sentence
    );
    match llm
        .complete("You are a patient English teacher.", &prompt)
        .await
    {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::warn!(error = %err, word = %word.word, "wrong-answer explanation unavailable");
            EXPLANATION_UNAVAILABLE.to_string()
        }
    }
}

pub async fn sentence_feedback(
    llm: &LlmProvider,
    word: &str,
    sentence: &str,
) -> ServiceResult<SentenceFeedback> {
    let prompt = format!(
        r#"The learner is practising "{word}" and wrote: "{}"
Return a JSON object with keys "analysis" (string, a brief grammar analysis),
"suggestion" (string, a more natural version of the sentence) and
"usage_ok" (boolean, whether "{word}" is used appropriately)."#,
        sentence.trim()
    );
    let raw = generate(llm, "You are an English grammar expert. Reply with JSON only.", &prompt).await?;
    parse_json(&raw)
}

/// A 50-80 word story that uses every given word.
pub async fn generate_story(llm: &LlmProvider, words: &[String]) -> ServiceResult<String> {
    let prompt = format!(
        r#"Write a short, coherent English story or dialogue (about 50-80 words) that uses
all of these words: {}. Return a JSON object with one key "story"."#,
        words.join(", ")
    );
    let raw = generate(llm, "You are a storyteller. Reply with JSON only.", &prompt).await?;
    let parsed: RawStory = parse_json(&raw)?;
    if parsed.story.trim().is_empty() {
        return Err(ServiceError::Enrichment("empty story".into()));
    }
    Ok(parsed.story.trim().to_string())
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{20000}'..='\u{2A6DF}')
    })
}

/// Drops a surrounding markdown fence and any prose around the JSON object.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.split_once('\n').map_or("", |(_, body)| body);
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn parse_word_info(text: &str, raw: &str) -> ServiceResult<(WordEntry, WordFacts)> {
    let info: RawWordInfo = parse_json(raw)?;
    let definition = non_blank(info.definition)
        .ok_or_else(|| ServiceError::Enrichment("response has no definition".into()))?;

    let entry = WordEntry {
        word: text.trim().to_string(),
        level: None,
        part_of_speech: non_blank(info.part_of_speech),
        definition: Some(definition),
        collocation: non_blank(info.collocation),
        mnemonic: non_blank(info.mnemonic),
        example1: non_blank(info.example),
        example2: None,
    };

    let mut facts = WordFacts::default();
    let groups = [
        (AffixKind::Prefix, info.etymology.prefixes),
        (AffixKind::Root, info.etymology.roots),
        (AffixKind::Suffix, info.etymology.suffixes),
    ];
    for (kind, list) in groups {
        facts.affixes.extend(
            list.into_iter()
                .filter(|affix| !affix.part.trim().is_empty())
                .map(|affix| AffixFact {
                    kind,
                    text: affix.part.trim().to_string(),
                    meaning: non_blank(affix.meaning),
                }),
        );
    }
    for (kind, list) in [
        (RelationKind::Synonym, info.synonyms),
        (RelationKind::Antonym, info.antonyms),
    ] {
        facts.relations.extend(
            list.into_iter()
                .map(|other| other.trim().to_string())
                .filter(|other| !other.is_empty() && !other.eq_ignore_ascii_case(text.trim()))
                .map(|other_word| RelationFact { kind, other_word }),
        );
    }

    Ok((entry, facts))
}

pub fn parse_suggestions(raw: &str) -> ServiceResult<Vec<Suggestion>> {
    let parsed: RawSuggestions = parse_json(raw)?;
    let suggestions: Vec<Suggestion> = parsed
        .suggestions
        .into_iter()
        .filter(|s| !s.word.trim().is_empty())
        .take(MAX_SUGGESTIONS)
        .collect();
    if suggestions.is_empty() {
        return Err(ServiceError::Enrichment("no suggestions returned".into()));
    }
    Ok(suggestions)
}

async fn generate(llm: &LlmProvider, system: &str, prompt: &str) -> ServiceResult<String> {
    llm.complete(system, prompt).await.map_err(|err| {
        tracing::warn!(error = %err, model = llm.model(), "text generation failed");
        ServiceError::Enrichment(err.to_string())
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> ServiceResult<T> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|err| ServiceError::Enrichment(format!("unparseable response: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_and_prose_are_stripped() {
        let raw = "```json\n{\"story\": \"hi\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"story\": \"hi\"}");
        assert_eq!(strip_code_fences("Sure! {\"a\":1} Enjoy."), "{\"a\":1}");
    }

    #[test]
    fn word_info_maps_to_entry_and_facts() {
        let raw = r#"```json
{
  "definition": "to leave behind",
  "part_of_speech": "verb",
  "example": "They had to abandon the car.",
  "synonyms": ["desert", " ", "abandon"],
  "antonyms": ["keep"],
  "etymology": {
    "prefixes": [{"prefix": "a", "meaning": "to"}],
    "roots": [{"part": "bandon", "meaning": "control"}],
    "suffixes": []
  }
}
```"#;
        let (entry, facts) = parse_word_info("abandon", raw).unwrap();
        assert_eq!(entry.word, "abandon");
        assert_eq!(entry.part_of_speech.as_deref(), Some("verb"));
        assert_eq!(entry.example1.as_deref(), Some("They had to abandon the car."));
        assert_eq!(facts.affixes.len(), 2);
        assert_eq!(facts.affixes[0].kind, AffixKind::Prefix);
        assert_eq!(facts.affixes[1].text, "bandon");
        let others: Vec<_> = facts.relations.iter().map(|r| r.other_word.as_str()).collect();
        assert_eq!(others, vec!["desert", "keep"]);
    }

    #[test]
    fn word_info_without_definition_is_a_failure() {
        let err = parse_word_info("x", r#"{"synonyms": []}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Enrichment(_)));
    }

    #[test]
    fn garbage_is_an_enrichment_failure() {
        assert!(matches!(
            parse_word_info("x", "I cannot help with that."),
            Err(ServiceError::Enrichment(_))
        ));
    }

    #[test]
    fn suggestions_are_capped() {
        let raw = r#"{"suggestions":[{"word":"a"},{"word":"b"},{"word":""},{"word":"c"},{"word":"d"},{"word":"e"},{"word":"f"}]}"#;
        let parsed = parse_suggestions(raw).unwrap();
        assert_eq!(parsed.len(), 5);
        assert!(parsed.iter().all(|s| !s.word.is_empty()));
    }

    #[test]
    fn sentence_feedback_parses_usage_flag() {
        let parsed: SentenceFeedback =
            parse_json(r#"{"analysis":"fine","suggestion":"ok","usage_ok":true}"#).unwrap();
        assert!(parsed.usage_ok);
    }

    #[test]
    fn cjk_detection() {
        assert!(contains_cjk("短暫的"));
        assert!(contains_cjk("word 字"));
        assert!(!contains_cjk("ephemeral"));
    }

    #[test]
    fn failed_lookup_reads_lookup_failed() {
        let failed = LookupResult::failed(" ephemeral ");
        assert_eq!(failed.source, LookupSource::Failed);
        assert_eq!(failed.entry.word, "ephemeral");
        assert_eq!(failed.entry.definition.as_deref(), Some(LOOKUP_FAILED));
    }
}

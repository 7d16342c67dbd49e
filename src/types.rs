//! Request-scoped data passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// Shown when a translation was found but no meaning could be resolved.
pub const MEANING_PLACEHOLDER: &str = "Значение не найдено";

/// A word to resolve together with the sentence it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    // Missing fields are rejected by the pipeline, not by the decoder.
    #[serde(default)]
    pub sentence: String,
    #[serde(default)]
    pub word: String,
}

impl AnalysisRequest {
    pub fn new(sentence: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            word: word.into(),
        }
    }
}

/// Base form produced by the model, possibly carrying a bracketed tag
/// such as `(f)`, `(p)` or `(+gen)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaCandidate(String);

impl LemmaCandidate {
    /// Returns `None` when the model reply holds no usable text.
    pub fn parse(reply: &str) -> Option<Self> {
        let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
        let line = line.trim_matches(|c| c == '"' || c == '«' || c == '»' || c == '`');
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(Self(line.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Curated (base word, translation) pair from the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub base_word: String,
    pub translation: String,
}

/// Candidates pulled out of a dictionary page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Document order, duplicates kept.
    pub meanings: Vec<String>,
    /// Document order, first occurrence of each cleaned string kept.
    pub translations: Vec<String>,
}

/// Successful resolution of a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub base_form: String,
    pub translation: String,
    pub meaning: String,
}

/// What the pipeline hands back to the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Resolved(AnalysisResult),
    /// Full-analysis reply that did not have the expected structure.
    Raw { raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemma_candidate_trims_reply() {
        let lemma = LemmaCandidate::parse("\n  прочитать (p)  \nextra").unwrap();
        assert_eq!(lemma.as_str(), "прочитать (p)");

        let quoted = LemmaCandidate::parse("«книга»").unwrap();
        assert_eq!(quoted.as_str(), "книга");
    }

    #[test]
    fn test_lemma_candidate_rejects_empty() {
        assert!(LemmaCandidate::parse("").is_none());
        assert!(LemmaCandidate::parse("  \n \n").is_none());
        assert!(LemmaCandidate::parse("\"\"").is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let resolved = AnalysisOutcome::Resolved(AnalysisResult {
            base_form: "книга".to_string(),
            translation: "book".to_string(),
            meaning: "печатное издание".to_string(),
        });
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["base_form"], "книга");
        assert_eq!(json["translation"], "book");

        let raw = AnalysisOutcome::Raw {
            raw: "not json".to_string(),
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json, serde_json::json!({ "raw": "not json" }));
    }
}

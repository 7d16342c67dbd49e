//! Model-driven stages: lemma extraction, disambiguation, meaning
//! generation and the full-analysis fallback.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CallError;
use crate::llm::{ChatModel, ChatRequest, Stage};
use crate::prompts;
use crate::types::{AnalysisOutcome, AnalysisResult, LemmaCandidate};

/// Runs the prompts of every model-driven stage against one chat model
pub struct ModelAnalyzer {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

// Reply shape expected from the full-analysis prompt
#[derive(Deserialize)]
struct FullAnalysisReply {
    #[serde(alias = "lemma", alias = "baseForm")]
    base_form: String,
    translation: String,
    #[serde(alias = "definition")]
    meaning: String,
}

impl ModelAnalyzer {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    async fn ask(&self, stage: Stage, prompt: (String, String)) -> Result<String, CallError> {
        let (system, user) = prompt;
        let request = ChatRequest {
            stage,
            system,
            user,
            temperature: self.temperature,
        };
        self.model.complete(&request).await
    }

    /// Like `ask`, but a failure only means "no result".
    async fn ask_optional(&self, stage: Stage, prompt: (String, String)) -> Option<String> {
        match self.ask(stage, prompt).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!("{} stage produced no result: {}", stage.as_str(), e);
                None
            }
        }
    }

    /// Tagged base form of `word` as used in `sentence`
    pub async fn extract_lemma(&self, sentence: &str, word: &str) -> Option<LemmaCandidate> {
        let reply = self
            .ask_optional(Stage::Lemma, prompts::lemma_prompt(sentence, word))
            .await?;
        LemmaCandidate::parse(&reply)
    }

    /// Best-fitting translation(s) among the dictionary candidates
    pub async fn select_translation(
        &self,
        sentence: &str,
        word: &str,
        base_form: &str,
        candidates: &[String],
    ) -> Option<String> {
        if let [only] = candidates {
            return Some(only.clone());
        }
        let prompt = prompts::translation_prompt(sentence, word, base_form, candidates);
        let reply = self.ask_optional(Stage::Translation, prompt).await?;
        sanitize_selection(&reply)
    }

    /// Dictionary definition matching the sense used in the sentence
    pub async fn select_meaning(
        &self,
        sentence: &str,
        word: &str,
        base_form: &str,
        candidates: &[String],
    ) -> Option<String> {
        if let [only] = candidates {
            return Some(only.clone());
        }
        let prompt = prompts::meaning_prompt(sentence, word, base_form, candidates);
        let reply = self.ask_optional(Stage::Meaning, prompt).await?;
        sanitize_selection(&reply)
    }

    /// Definition written by the model when the dictionary has none
    pub async fn generate_meaning(&self, sentence: &str, word: &str, base_form: &str) -> Option<String> {
        let prompt = prompts::meaning_generation_prompt(sentence, word, base_form);
        let reply = self.ask_optional(Stage::MeaningGeneration, prompt).await?;
        sanitize_selection(&reply)
    }

    /// Single-call analysis. A failed call is an error; an unparseable
    /// reply is returned raw.
    pub async fn full_analysis(&self, sentence: &str, word: &str) -> Result<AnalysisOutcome, CallError> {
        let reply = self
            .ask(Stage::FullAnalysis, prompts::full_analysis_prompt(sentence, word))
            .await?;
        Ok(parse_full_analysis(&reply))
    }
}

/// Parse the full-analysis reply, falling back to the raw text
pub fn parse_full_analysis(reply: &str) -> AnalysisOutcome {
    let parsed = extract_json(reply).and_then(|json| serde_json::from_str::<FullAnalysisReply>(json).ok());

    match parsed {
        Some(p) => {
            let result = AnalysisResult {
                base_form: p.base_form.trim().to_string(),
                translation: p.translation.trim().to_string(),
                meaning: p.meaning.trim().to_string(),
            };
            if result.base_form.is_empty() || result.translation.is_empty() || result.meaning.is_empty() {
                tracing::warn!("Full analysis reply has empty fields, returning it raw");
                AnalysisOutcome::Raw { raw: reply.to_string() }
            } else {
                AnalysisOutcome::Resolved(result)
            }
        }
        None => {
            tracing::warn!("Full analysis reply is not the expected JSON, returning it raw");
            AnalysisOutcome::Raw { raw: reply.to_string() }
        }
    }
}

/// Extract JSON from potentially wrapped response
fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    // If it starts with {, assume it's JSON
    if trimmed.starts_with('{') {
        let mut depth = 0;
        for (i, c) in trimmed.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&trimmed[..=i]);
                    }
                }
                _ => {}
            }
        }
    }

    // Try to find JSON in code blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return Some(trimmed[json_start..json_start + end].trim());
        }
    }

    // Try to find any JSON object
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

/// First non-empty line without list numbering or wrapping quotes
fn sanitize_selection(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let line = if digits > 0 {
        let rest = &line[digits..];
        rest.strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .map(str::trim_start)
            .unwrap_or(line)
    } else {
        line
    };

    let line = line.trim_matches(|c| c == '"' || c == '«' || c == '»').trim();
    (!line.is_empty()).then(|| line.to_string())
}

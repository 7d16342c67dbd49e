//! Curated lexicon lookup over a keyword-search index.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{CallError, ConfigError};
use crate::llm::check_status_for;
use crate::types::LexiconEntry;

const SERVICE: &str = "lexicon";

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\((?:m|f|n|p|i|\+(?:nom|gen|dat|acc|instr|prep))\)").expect("valid tag pattern")
});

/// Bare lookup key for a lemma candidate: tags and stress marks removed,
/// everything after the first whitespace dropped.
pub fn search_key(candidate: &str) -> String {
    let untagged = TAG.replace_all(candidate, " ");
    untagged
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|&c| c != '\u{0301}' && c != '\u{0300}')
        .collect()
}

/// Source of curated (base word, translation) pairs
#[async_trait]
pub trait Lexicon: Send + Sync {
    /// `Ok(None)` means the index has no complete entry for `key`.
    async fn lookup(&self, key: &str) -> Result<Option<LexiconEntry>, CallError>;
}

/// Client for a hosted keyword-search index
pub struct SearchLexicon {
    client: Client,
    url: String,
    app_id: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    query: &'a str,
    #[serde(rename = "hitsPerPage")]
    hits_per_page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    base_word: Option<String>,
    #[serde(default)]
    translation: Option<String>,
}

impl SearchLexicon {
    pub fn new(client: Client, config: &Config) -> Result<Self, ConfigError> {
        let app_id = config
            .get_lexicon_app_id()
            .ok_or(ConfigError::MissingCredential(SERVICE))?;
        let api_key = config
            .get_lexicon_api_key()
            .ok_or(ConfigError::MissingCredential(SERVICE))?;
        let base = config
            .get_lexicon_url()
            .ok_or(ConfigError::MissingCredential(SERVICE))?;

        Ok(Self {
            client,
            url: format!(
                "{}/1/indexes/{}/query",
                base.trim_end_matches('/'),
                config.lexicon.index
            ),
            app_id,
            api_key,
            timeout: config.lexicon_timeout(),
        })
    }
}

#[async_trait]
impl Lexicon for SearchLexicon {
    async fn lookup(&self, key: &str) -> Result<Option<LexiconEntry>, CallError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
            .json(&SearchQuery {
                query: key,
                hits_per_page: 1,
            })
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        let response = check_status_for(SERVICE, response).await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        Ok(top_entry(body))
    }
}

/// Only the top-ranked hit counts, and only when both fields are filled.
fn top_entry(response: SearchResponse) -> Option<LexiconEntry> {
    let hit = response.hits.into_iter().next()?;
    let base_word = hit.base_word.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
    let translation = hit.translation.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
    Some(LexiconEntry { base_word, translation })
}

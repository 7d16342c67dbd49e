//! Resolution pipeline: lemma, lexicon, dictionary, disambiguation and
//! the full-analysis fallback, run strictly in sequence.

use std::sync::Arc;

use crate::analyzer::ModelAnalyzer;
use crate::config::Config;
use crate::dictionary::{Dictionary, WiktionaryClient};
use crate::error::ResolveError;
use crate::lexicon::{search_key, Lexicon, SearchLexicon};
use crate::llm::{ChatModel, LlmClient};
use crate::markup;
use crate::types::{
    AnalysisOutcome, AnalysisRequest, AnalysisResult, Extraction, LemmaCandidate, LexiconEntry,
    MEANING_PLACEHOLDER,
};

/// Where a request currently is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    LemmaExtracted,
    LexiconMatched,
    DictionaryFetched,
    TranslationChosen,
    MeaningChosen,
    FullFallback,
    Done,
}

/// Sources gathered for one request before any disambiguation
#[derive(Debug, Clone)]
pub struct Sources {
    pub lemma: LemmaCandidate,
    pub lexicon: Option<LexiconEntry>,
    pub extraction: Extraction,
}

/// Resolves words against the model, lexicon and dictionary
pub struct Pipeline {
    analyzer: ModelAnalyzer,
    lexicon: Arc<dyn Lexicon>,
    dictionary: Arc<dyn Dictionary>,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn ChatModel>,
        lexicon: Arc<dyn Lexicon>,
        dictionary: Arc<dyn Dictionary>,
        temperature: f32,
    ) -> Self {
        Self {
            analyzer: ModelAnalyzer::new(model, temperature),
            lexicon,
            dictionary,
        }
    }

    /// Wire the HTTP collaborators to one shared connection pool. Missing
    /// credentials surface as a server-side `ResolveError::Config`.
    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        config.validate()?;
        let client = reqwest::Client::new();

        let model = LlmClient::new(client.clone(), config.clone())?;
        let lexicon = SearchLexicon::new(client.clone(), config)?;
        let dictionary = WiktionaryClient::new(client, config);

        Ok(Self::new(
            Arc::new(model),
            Arc::new(lexicon),
            Arc::new(dictionary),
            config.llm.temperature,
        ))
    }

    /// Resolve base form, translation and meaning of `request.word`
    pub async fn resolve(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ResolveError> {
        let sentence = request.sentence.trim();
        let word = request.word.trim();
        if sentence.is_empty() {
            return Err(ResolveError::InvalidInput("sentence"));
        }
        if word.is_empty() {
            return Err(ResolveError::InvalidInput("word"));
        }
        if !sentence.to_lowercase().contains(&word.to_lowercase()) {
            tracing::warn!("Word {:?} does not occur in sentence {:?}", word, sentence);
        }

        enter(State::Start, word);
        let Some(sources) = self.gather(sentence, word).await else {
            return self.full_fallback(sentence, word).await;
        };

        match self.reconcile(sentence, word, sources).await {
            Some(result) => {
                enter(State::Done, word);
                Ok(AnalysisOutcome::Resolved(result))
            }
            None => self.full_fallback(sentence, word).await,
        }
    }

    /// Lemma, lexicon entry and dictionary candidates. `None` when the model
    /// gave no usable lemma.
    async fn gather(&self, sentence: &str, word: &str) -> Option<Sources> {
        let lemma = self.analyzer.extract_lemma(sentence, word).await?;
        let key = search_key(lemma.as_str());
        if key.is_empty() {
            tracing::warn!("Lemma {:?} has no searchable base word", lemma.as_str());
            return None;
        }
        enter(State::LemmaExtracted, word);

        let lexicon = match self.lexicon.lookup(&key).await {
            Ok(Some(entry)) => {
                enter(State::LexiconMatched, word);
                if entry.base_word != key {
                    tracing::debug!("Lexicon base word {:?} differs from lemma {:?}", entry.base_word, key);
                }
                Some(entry)
            }
            Ok(None) => {
                tracing::debug!("No lexicon match for {:?}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Lexicon lookup for {:?} failed: {}", key, e);
                None
            }
        };

        // Always keyed by the model lemma, never by the lexicon's base word.
        let extraction = match self.dictionary.fetch(&key).await {
            Ok(Some(page)) => markup::extract(&page),
            Ok(None) => {
                tracing::debug!("No dictionary page for {:?}", key);
                Extraction::default()
            }
            Err(e) => {
                tracing::warn!("Dictionary fetch for {:?} failed: {}", key, e);
                Extraction::default()
            }
        };
        enter(State::DictionaryFetched, word);
        tracing::debug!(
            "{} meaning and {} translation candidates for {:?}",
            extraction.meanings.len(),
            extraction.translations.len(),
            key
        );

        Some(Sources {
            lemma,
            lexicon,
            extraction,
        })
    }

    /// Combine already-fetched sources into a result. `None` when no
    /// translation could be resolved.
    pub async fn reconcile(&self, sentence: &str, word: &str, sources: Sources) -> Option<AnalysisResult> {
        let Sources {
            lemma,
            lexicon,
            extraction,
        } = sources;

        let (base_form, lexicon_translation) = match lexicon {
            Some(entry) => (entry.base_word, Some(entry.translation)),
            None => (lemma.as_str().to_string(), None),
        };

        let translation = match lexicon_translation {
            Some(t) => Some(t),
            None if !extraction.translations.is_empty() => {
                self.analyzer
                    .select_translation(sentence, word, &base_form, &extraction.translations)
                    .await
            }
            None => None,
        };
        let Some(translation) = translation else {
            tracing::info!("No translation resolved for {:?}, discarding partial result", word);
            return None;
        };
        enter(State::TranslationChosen, word);

        let meaning = if extraction.meanings.is_empty() {
            self.analyzer.generate_meaning(sentence, word, &base_form).await
        } else {
            self.analyzer
                .select_meaning(sentence, word, &base_form, &extraction.meanings)
                .await
        };
        let meaning = match meaning {
            Some(m) => {
                enter(State::MeaningChosen, word);
                m
            }
            None => {
                tracing::warn!("No meaning resolved for {:?}, using placeholder", word);
                MEANING_PLACEHOLDER.to_string()
            }
        };

        Some(AnalysisResult {
            base_form,
            translation,
            meaning,
        })
    }

    async fn full_fallback(&self, sentence: &str, word: &str) -> Result<AnalysisOutcome, ResolveError> {
        enter(State::FullFallback, word);
        match self.analyzer.full_analysis(sentence, word).await {
            Ok(outcome) => {
                enter(State::Done, word);
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Full analysis of {:?} failed: {}", word, e);
                Err(ResolveError::Unresolved)
            }
        }
    }
}

fn enter(state: State, word: &str) {
    tracing::debug!("{:?}: {:?}", word, state);
}

//! Configuration management for slovo
//!
//! Handles loading and parsing of `slovo.toml` configuration file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Keyword-search lexicon settings
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Collaborative dictionary settings
    #[serde(default)]
    pub dictionary: DictionaryConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai", "claude", or "none"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key (can also be set via environment variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (e.g., "gpt-4o-mini", "claude-3-5-sonnet-20241022")
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; keep low so morphology stays stable
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Overall timeout of a single call
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step between attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Keyword-search lexicon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Search service base URL; defaults to the hosted endpoint of `app_id`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Application id (or `SLOVO_LEXICON_APP_ID`)
    #[serde(default)]
    pub app_id: Option<String>,

    /// Search API key (or `SLOVO_LEXICON_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Index holding curated word entries
    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            app_id: None,
            api_key: None,
            index: default_index(),
            timeout_secs: default_service_timeout(),
        }
    }
}

/// Collaborative dictionary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default = "default_dictionary_url")]
    pub base_url: String,

    /// Wiki APIs reject anonymous clients without a user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_dictionary_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_service_timeout(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.1
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_index() -> String {
    "words".to_string()
}

fn default_service_timeout() -> u64 {
    10
}

fn default_dictionary_url() -> String {
    "https://ru.wiktionary.org".to_string()
}

fn default_user_agent() -> String {
    format!("slovo/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "slovo").map(|dirs| dirs.config_dir().join("slovo.toml"))
    }

    /// Load configuration from default path or working directory
    pub fn load_from_default() -> Self {
        let workspace_path = PathBuf::from("slovo.toml");
        if workspace_path.exists() {
            match Self::load(&workspace_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring unreadable {}: {}", workspace_path.display(), e),
            }
        }

        if let Some(default_path) = Self::default_path() {
            if let Ok(config) = Self::load(&default_path) {
                return config;
            }
        }

        Config::default()
    }

    /// Get the effective API key (from config or environment)
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = non_empty(&self.llm.api_key) {
            return Some(key);
        }

        match self.llm.provider.as_str() {
            "claude" => env_non_empty("ANTHROPIC_API_KEY"),
            "openai" => env_non_empty("OPENAI_API_KEY"),
            _ => None,
        }
    }

    /// Get the effective model name
    pub fn get_model(&self) -> String {
        self.llm
            .model
            .clone()
            .unwrap_or_else(|| match self.llm.provider.as_str() {
                "claude" => "claude-3-5-sonnet-20241022".to_string(),
                "openai" => "gpt-4o-mini".to_string(),
                _ => String::new(),
            })
    }

    /// Lexicon application id (from config or environment)
    pub fn get_lexicon_app_id(&self) -> Option<String> {
        non_empty(&self.lexicon.app_id).or_else(|| env_non_empty("SLOVO_LEXICON_APP_ID"))
    }

    /// Lexicon API key (from config or environment)
    pub fn get_lexicon_api_key(&self) -> Option<String> {
        non_empty(&self.lexicon.api_key).or_else(|| env_non_empty("SLOVO_LEXICON_API_KEY"))
    }

    /// Effective lexicon endpoint
    pub fn get_lexicon_url(&self) -> Option<String> {
        self.lexicon
            .base_url
            .clone()
            .or_else(|| self.get_lexicon_app_id().map(|id| format!("https://{}-dsn.algolia.net", id)))
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn lexicon_timeout(&self) -> Duration {
        Duration::from_secs(self.lexicon.timeout_secs)
    }

    pub fn dictionary_timeout(&self) -> Duration {
        Duration::from_secs(self.dictionary.timeout_secs)
    }

    /// Check that every required collaborator can be reached
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.llm.provider.as_str() {
            "claude" | "openai" => {}
            "none" => return Err(ConfigError::MissingCredential("llm")),
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        }
        if self.get_api_key().is_none() {
            return Err(ConfigError::MissingCredential("llm"));
        }
        if self.get_lexicon_app_id().is_none() || self.get_lexicon_api_key().is_none() {
            return Err(ConfigError::MissingCredential("lexicon"));
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

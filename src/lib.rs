//! slovo - context-aware word resolver for Russian
//!
//! Resolves a word inside a sentence to its tagged base form, an English
//! translation fitting the context and a Russian definition, combining a
//! language model, a curated lexicon and Wiktionary page source.

pub mod analyzer;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod lexicon;
pub mod llm;
pub mod markup;
#[cfg(test)]
mod mock_http;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod types;

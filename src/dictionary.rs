//! Raw page source from the collaborative dictionary.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::error::CallError;
use crate::llm::check_status_for;

const SERVICE: &str = "dictionary";

/// Page id the wiki API uses for titles that do not exist.
const MISSING_PAGE_ID: &str = "-1";

/// Source of raw dictionary markup
#[async_trait]
pub trait Dictionary: Send + Sync {
    /// `Ok(None)` when the page does not exist.
    async fn fetch(&self, title: &str) -> Result<Option<String>, CallError>;
}

/// MediaWiki API client for a Wiktionary edition
pub struct WiktionaryClient {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Debug, Deserialize)]
struct Query {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(default)]
    slots: Option<Slots>,
    #[serde(rename = "*", default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: Slot,
}

#[derive(Debug, Deserialize)]
struct Slot {
    #[serde(rename = "*", default)]
    content: Option<String>,
}

impl WiktionaryClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!("{}/w/api.php", config.dictionary.base_url.trim_end_matches('/')),
            user_agent: config.dictionary.user_agent.clone(),
            timeout: config.dictionary_timeout(),
        }
    }
}

#[async_trait]
impl Dictionary for WiktionaryClient {
    async fn fetch(&self, title: &str) -> Result<Option<String>, CallError> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", title),
            ])
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        let response = check_status_for(SERVICE, response).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        Ok(page_markup(body))
    }
}

fn page_markup(response: QueryResponse) -> Option<String> {
    let pages = response.query?.pages;
    if pages.contains_key(MISSING_PAGE_ID) {
        return None;
    }

    let page = pages.into_values().find(|p| p.missing.is_none())?;
    let revision = page.revisions.into_iter().next()?;
    revision
        .slots
        .and_then(|s| s.main.content)
        .or(revision.content)
        .filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_http::MockHttp;

    fn client_for(server: &MockHttp) -> WiktionaryClient {
        let mut config = Config::default();
        config.dictionary.base_url = server.url.clone();
        config.dictionary.user_agent = "slovo-test/1.0".to_string();
        WiktionaryClient::new(Client::new(), &config)
    }

    fn parse(json: &str) -> Option<String> {
        page_markup(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_missing_page_is_none() {
        let json = r#"{"batchcomplete": "", "query": {"pages": {"-1": {"ns": 0, "title": "ыыы", "missing": ""}}}}"#;
        assert_eq!(parse(json), None);
    }

    #[test]
    fn test_page_content_from_main_slot() {
        let json = r#"{"query": {"pages": {"12345": {
            "pageid": 12345, "ns": 0, "title": "книга",
            "revisions": [{"slots": {"main": {"contentmodel": "wikitext", "*": "= {{-ru-}} =\n==== Значение ===="}}}]
        }}}}"#;
        assert_eq!(parse(json), Some("= {{-ru-}} =\n==== Значение ====".to_string()));
    }

    #[test]
    fn test_page_content_legacy_revision() {
        let json = r##"{"query": {"pages": {"7": {"pageid": 7, "revisions": [{"*": "# значение"}]}}}}"##;
        assert_eq!(parse(json), Some("# значение".to_string()));
    }

    #[test]
    fn test_invalid_title_and_empty_query() {
        assert_eq!(parse(r#"{"query": {"pages": {"-1": {"invalid": ""}}}}"#), None);
        assert_eq!(parse(r#"{"batchcomplete": ""}"#), None);
        assert_eq!(parse(r#"{"query": {"pages": {"7": {"revisions": []}}}}"#), None);
    }

    #[test]
    fn test_endpoint_from_config() {
        let mut config = Config::default();
        config.dictionary.base_url = "http://localhost:8080/".to_string();

        let client = WiktionaryClient::new(Client::new(), &config);
        assert_eq!(client.endpoint, "http://localhost:8080/w/api.php");
    }

    #[tokio::test]
    async fn test_fetch_queries_page_source() {
        let server = MockHttp::start(
            "200 OK",
            r##"{"query": {"pages": {"42": {"revisions": [{"slots": {"main": {"*": "# значение"}}}]}}}}"##,
        )
        .await;

        let markup = client_for(&server).fetch("книга").await.unwrap();
        assert_eq!(markup, Some("# значение".to_string()));

        let sent = server.last_request();
        assert!(sent.starts_with(
            "GET /w/api.php?action=query&prop=revisions&rvprop=content&rvslots=main&redirects=1&format=json\
             &titles=%D0%BA%D0%BD%D0%B8%D0%B3%D0%B0 "
        ));
        assert!(sent.to_lowercase().contains("user-agent: slovo-test/1.0"));
    }

    #[tokio::test]
    async fn test_fetch_missing_page() {
        let server = MockHttp::start("200 OK", r#"{"query": {"pages": {"-1": {"missing": ""}}}}"#).await;

        assert_eq!(client_for(&server).fetch("ыыы").await, Ok(None));
    }

    #[tokio::test]
    async fn test_fetch_status_error() {
        let server = MockHttp::start("503 Service Unavailable", "busy").await;

        assert_eq!(
            client_for(&server).fetch("книга").await,
            Err(CallError::Status {
                service: "dictionary",
                status: 503,
                body: "busy".to_string(),
            })
        );
    }
}

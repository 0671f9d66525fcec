//! Web search tool
//!
//! Returns prose with inline `[n]` citations plus the source list the
//! citations index into. The provider seam keeps the engine testable;
//! the HTTP implementation talks to a Perplexity-style chat-completions
//! endpoint and lifts its `search_results` into `SourceRecord`s.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::SourceRecord;
use crate::tools::client::Client;

pub const WEB_SEARCH_TOOL: &str = "web-search";

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_MODEL: &str = "sonar";

/// The tool's output: citation-annotated text plus its sources.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchResults {
    pub text: String,
    pub sources: Vec<SourceRecord>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResults>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    search_results: Vec<RawSearchResult>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct RawSearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

pub struct HttpSearchProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl HttpSearchProvider {
    pub fn new(api_key: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {api_key}")
                .parse()
                .map_err(|_| anyhow!("API key is not a valid header value"))?,
        );
        Ok(HttpSearchProvider {
            client: Client::with_headers(headers)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &str) -> Result<SearchResults> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![CompletionMessage {
                role: "user",
                content: query,
            }],
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response: CompletionResponse = self.client.post(url, &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let sources = response
            .search_results
            .into_iter()
            .filter(|raw| !raw.url.is_empty())
            .map(|raw| SourceRecord {
                title: raw
                    .title
                    .filter(|t| !t.is_empty())
                    .or_else(|| Some(domain_of(&raw.url))),
                url: raw.url,
                description: raw.snippet,
                last_updated: raw.last_updated,
            })
            .collect();

        Ok(SearchResults { text, sources })
    }
}

/// Hostname of a URL, with a leading `www.` stripped. Falls back to the
/// input when it does not look like a URL.
fn domain_of(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        return url.to_string();
    }
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_fallback_strips_www() {
        assert_eq!(domain_of("https://www.lonelyplanet.com/spain"), "lonelyplanet.com");
        assert_eq!(domain_of("http://example.org"), "example.org");
        assert_eq!(domain_of("https://example.org:8443/a?b=c"), "example.org");
    }

    #[test]
    fn test_domain_fallback_keeps_non_urls() {
        assert_eq!(domain_of("not a url"), "not a url");
    }

    #[test]
    fn test_search_results_round_trip() {
        let results = SearchResults {
            text: "Spring is ideal [1].".to_string(),
            sources: vec![SourceRecord::new("https://a")],
        };
        let wire = serde_json::to_value(&results).unwrap();
        assert_eq!(wire["sources"][0]["url"], "https://a");
        let back: SearchResults = serde_json::from_value(wire).unwrap();
        assert_eq!(back, results);
    }
}

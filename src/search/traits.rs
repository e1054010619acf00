// Search provider trait and the typed subset of a Custom Search response.
//
// Only the projected fields are modelled. Anything else the API sends is
// ignored; a missing required field is a parse error rather than a panic
// further down the pipeline.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level Custom Search response (projected fields only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub queries: SearchQueries,
    /// Absent when the query has zero results.
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQueries {
    /// Echo of the request; the API always sends exactly one entry.
    pub request: Vec<RequestInfo>,
}

/// Request metadata echoed back by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    /// Sent as a decimal string, e.g. "129000000".
    #[serde(default)]
    pub total_results: Option<String>,
    pub search_terms: String,
    #[serde(default)]
    pub hl: Option<String>,
    #[serde(default)]
    pub gl: Option<String>,
}

/// One organic result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub title: String,
    pub link: String,
    pub display_link: String,
    /// Some results (e.g. PDFs) come back without a snippet.
    #[serde(default)]
    pub snippet: String,
}

impl SearchResponse {
    /// Snippet of the top-ranked item, if there is a non-empty one.
    pub fn top_snippet(&self) -> Option<&str> {
        self.items
            .first()
            .map(|item| item.snippet.trim())
            .filter(|s| !s.is_empty())
    }

    /// The request echo, if the API sent one.
    pub fn request(&self) -> Option<&RequestInfo> {
        self.queries.request.first()
    }

    /// Reported total result count; 0 when absent or unparseable.
    pub fn total_results(&self) -> i64 {
        self.request()
            .and_then(|r| r.total_results.as_deref())
            .and_then(|t| t.parse().ok())
            .unwrap_or(0)
    }
}

/// A web search backend that returns the top matches for a keyword.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search. `hl` is the interface language, `gl` the country.
    async fn search(&self, query: &str, hl: &str, gl: &str) -> Result<SearchResponse>;

    /// Run one search, logging and swallowing any failure.
    ///
    /// `None` means "skip this keyword", never a fatal condition.
    async fn try_search(&self, query: &str, hl: &str, gl: &str) -> Option<SearchResponse> {
        match self.search(query, hl, gl).await {
            Ok(response) => Some(response),
            Err(e) => {
                let error = format!("{e:#}");
                warn!(query = query, error = %error, "Search failed, skipping keyword");
                None
            }
        }
    }
}

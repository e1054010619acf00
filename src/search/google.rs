// Google Custom Search JSON API client.
//
// One GET per keyword against customsearch/v1, asking for the first ten
// results and only the fields the pipeline reads. The free tier allows
// 100 queries a day, so calls are spaced by a rate limiter.
//
// API docs: https://developers.google.com/custom-search/v1/reference/rest/v1/cse/list

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{SearchProvider, SearchResponse};

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Partial-response projection sent as the `fields` parameter.
pub const FIELD_PROJECTION: &str =
    "queries(request(totalResults,searchTerms,hl,gl)),items(title,displayLink,link,snippet)";

/// Results requested per query (the API maximum).
pub const RESULTS_PER_QUERY: u32 = 10;

pub struct GoogleSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    search_engine_id: String,
    rate_limiter: RateLimiter,
}

impl GoogleSearchClient {
    /// Create a client for the given API key and search engine id (`cx`).
    pub fn new(api_key: String, search_engine_id: String, qps: f64) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, search_engine_id, qps)
    }

    /// Same as `new`, against a different base URL.
    pub fn with_endpoint(
        endpoint: &str,
        api_key: String,
        search_engine_id: String,
        qps: f64,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("kwcluster/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            search_engine_id,
            rate_limiter: RateLimiter::new(qps)?,
        })
    }

    /// Query parameters for one search, key excluded.
    pub fn query_params(&self, query: &str, hl: &str, gl: &str) -> Vec<(&'static str, String)> {
        vec![
            ("cx", self.search_engine_id.clone()),
            ("q", query.to_string()),
            ("hl", hl.to_string()),
            ("gl", gl.to_string()),
            ("num", RESULTS_PER_QUERY.to_string()),
            ("fields", FIELD_PROJECTION.to_string()),
        ]
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str, hl: &str, gl: &str) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            anyhow::bail!("Refusing to search for an empty keyword");
        }

        self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .query(&self.query_params(query, hl, gl))
            .send()
            .await
            .context("Custom Search API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Custom Search API returned {}: {}", status, body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read Custom Search response body")?;

        let parsed = parse_response(&body)?;

        debug!(
            query = query,
            items = parsed.items.len(),
            total_results = parsed.total_results(),
            "Search complete"
        );

        Ok(parsed)
    }
}

/// Parse a Custom Search JSON body into the typed response.
pub fn parse_response(body: &str) -> Result<SearchResponse> {
    serde_json::from_str(body).context("Failed to parse Custom Search response")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleSearchClient {
        GoogleSearchClient::new("secret".to_string(), "engine123".to_string(), 1.0).unwrap()
    }

    #[test]
    fn test_query_params_carry_locale_and_projection() {
        let client = client();
        let params = client.query_params("rust async", "fr", "ca");
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("cx"), Some("engine123"));
        assert_eq!(get("q"), Some("rust async"));
        assert_eq!(get("hl"), Some("fr"));
        assert_eq!(get("gl"), Some("ca"));
        assert_eq!(get("num"), Some("10"));
        assert_eq!(get("fields"), Some(FIELD_PROJECTION));
        // Attached separately in `search`
        assert_eq!(get("key"), None);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = GoogleSearchClient::with_endpoint(
            "http://localhost:9999/",
            "k".to_string(),
            "cx".to_string(),
            1.0,
        )
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:9999");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_without_network() {
        let err = client().search("   ", "en", "us").await.unwrap_err();
        assert!(err.to_string().contains("empty keyword"));
    }

    #[tokio::test]
    async fn test_try_search_swallows_failures() {
        assert!(client().try_search("", "en", "us").await.is_none());
    }

    #[test]
    fn test_parse_response_shape_mismatch_is_clear() {
        let err = parse_response(r#"{"queries": {"request": "oops"}}"#).unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to parse Custom Search response"));
    }
}

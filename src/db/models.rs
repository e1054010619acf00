// Data models: Rust structs that map to database rows.
//
// Kept separate from the queries so other modules can build rows without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// Timestamp format shared by both tables. Sorts correctly as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One search result item for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultRow {
    pub request_timestamp: String,
    pub search_terms: String,
    pub gl: String,
    pub hl: String,
    pub total_results: i64,
    pub link: String,
    pub display_link: String,
    pub main_domain: Option<String>,
    /// 1-based rank within the response
    pub position: u32,
    pub snippet: String,
    /// ISO 639-3 code, None when detection isn't reliable
    pub snippet_language: Option<String>,
    pub snippet_match_score_order: u8,
    pub snippet_match_score_token: u8,
    pub title: String,
    pub title_match_score_order: u8,
    pub title_match_score_token: u8,
}

/// One keyword's label in one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignmentRow {
    pub request_timestamp: String,
    /// -1 = noise, -2 = keyword could not be resolved
    pub cluster: i32,
    pub search_terms: String,
}

/// Summary of one stored clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub request_timestamp: String,
    pub keywords: u32,
    /// Distinct non-negative labels
    pub clusters: u32,
    pub noise: u32,
}

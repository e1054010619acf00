// Search response → keywords_serps rows.
//
// Besides copying the API fields, each row carries a few cheap derived
// signals: the registrable-looking host of the link, the detected snippet
// language, and two fuzzy match scores of the keyword against the title
// and the snippet (one order-sensitive, one over sorted tokens).

use strsim::normalized_levenshtein;
use url::Url;

use crate::db::models::SearchResultRow;
use crate::search::SearchResponse;

/// Build one row per result item, positions starting at 1.
pub fn build_rows(
    request_timestamp: &str,
    keyword: &str,
    hl: &str,
    gl: &str,
    response: &SearchResponse,
) -> Vec<SearchResultRow> {
    let echo = response.request();
    let hl = echo.and_then(|r| r.hl.as_deref()).unwrap_or(hl);
    let gl = echo.and_then(|r| r.gl.as_deref()).unwrap_or(gl);
    let total_results = response.total_results();

    response
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| SearchResultRow {
            request_timestamp: request_timestamp.to_string(),
            search_terms: keyword.to_string(),
            gl: gl.to_string(),
            hl: hl.to_string(),
            total_results,
            link: item.link.clone(),
            display_link: item.display_link.clone(),
            main_domain: main_domain(&item.link),
            position: i as u32 + 1,
            snippet: item.snippet.clone(),
            snippet_language: detect_language(&item.snippet),
            snippet_match_score_order: match_score_order(keyword, &item.snippet),
            snippet_match_score_token: match_score_token(keyword, &item.snippet),
            title: item.title.clone(),
            title_match_score_order: match_score_order(keyword, &item.title),
            title_match_score_token: match_score_token(keyword, &item.title),
        })
        .collect()
}

/// Lower-cased host of `link` without a leading `www.`.
pub fn main_domain(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    Some(host.to_string())
}

/// ISO 639-3 code of `text`, when the detector is confident.
pub fn detect_language(text: &str) -> Option<String> {
    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .map(|info| info.lang().code().to_string())
}

/// 0–100 similarity of the two strings, case-insensitive, order-sensitive.
pub fn match_score_order(a: &str, b: &str) -> u8 {
    to_score(normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()))
}

/// 0–100 similarity after sorting the alphanumeric tokens of both strings.
pub fn match_score_token(a: &str, b: &str) -> u8 {
    to_score(normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b)))
}

fn sorted_tokens(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

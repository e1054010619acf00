// Unit tests for the Custom Search response types.
//
// Tests serde deserialization of realistic API bodies and the helpers the
// pipeline relies on without network access.

use kwcluster::search::google::parse_response;
use kwcluster::search::SearchResponse;

const FULL_BODY: &str = r#"{
  "queries": {
    "request": [
      {
        "totalResults": "129000000",
        "searchTerms": "best hiking boots",
        "hl": "en",
        "gl": "us"
      }
    ]
  },
  "items": [
    {
      "title": "The 10 Best Hiking Boots of 2026",
      "displayLink": "www.outdoorgearlab.com",
      "link": "https://www.outdoorgearlab.com/topics/shoes-and-boots/best-hiking-boots",
      "snippet": "We tested hiking boots from top brands on rocky trails and river crossings."
    },
    {
      "title": "Hiking Boots | REI Co-op",
      "displayLink": "www.rei.com",
      "link": "https://www.rei.com/c/hiking-boots",
      "snippet": "Shop hiking boots at REI."
    }
  ]
}"#;

#[test]
fn deserialize_full_response() {
    let resp = parse_response(FULL_BODY).unwrap();
    assert_eq!(resp.items.len(), 2);
    assert_eq!(resp.items[0].display_link, "www.outdoorgearlab.com");
    assert_eq!(resp.items[1].title, "Hiking Boots | REI Co-op");

    let request = resp.request().unwrap();
    assert_eq!(request.search_terms, "best hiking boots");
    assert_eq!(request.hl.as_deref(), Some("en"));
    assert_eq!(request.gl.as_deref(), Some("us"));
    assert_eq!(resp.total_results(), 129_000_000);
}

#[test]
fn top_snippet_is_first_item() {
    let resp = parse_response(FULL_BODY).unwrap();
    assert_eq!(
        resp.top_snippet(),
        Some("We tested hiking boots from top brands on rocky trails and river crossings.")
    );
}

#[test]
fn zero_results_has_no_items() {
    // The API omits `items` entirely when nothing matches
    let body = r#"{"queries": {"request": [{"totalResults": "0", "searchTerms": "zzqxv"}]}}"#;
    let resp = parse_response(body).unwrap();
    assert!(resp.items.is_empty());
    assert!(resp.top_snippet().is_none());
    assert_eq!(resp.total_results(), 0);
}

#[test]
fn missing_snippet_defaults_to_empty() {
    let body = r#"{
        "queries": {"request": [{"searchTerms": "report pdf"}]},
        "items": [{"title": "Annual report", "displayLink": "example.org", "link": "https://example.org/r.pdf"}]
    }"#;
    let resp = parse_response(body).unwrap();
    assert_eq!(resp.items[0].snippet, "");
    // Blank snippets don't count as usable
    assert!(resp.top_snippet().is_none());
}

#[test]
fn missing_required_item_field_is_an_error() {
    let body = r#"{
        "queries": {"request": [{"searchTerms": "x"}]},
        "items": [{"title": "No link here", "displayLink": "example.org"}]
    }"#;
    let err = parse_response(body).unwrap_err();
    assert!(format!("{err:#}").contains("link"), "got: {err:#}");
}

#[test]
fn missing_queries_is_an_error() {
    assert!(parse_response(r#"{"items": []}"#).is_err());
}

#[test]
fn unparseable_total_results_is_zero() {
    let resp = SearchResponse {
        queries: kwcluster::search::SearchQueries {
            request: vec![kwcluster::search::RequestInfo {
                total_results: Some("lots".to_string()),
                search_terms: "x".to_string(),
                hl: None,
                gl: None,
            }],
        },
        items: vec![],
    };
    assert_eq!(resp.total_results(), 0);
}

#[test]
fn unknown_fields_are_ignored() {
    let body = r#"{
        "kind": "customsearch#search",
        "queries": {"request": [{"searchTerms": "x", "count": 10}], "nextPage": []},
        "items": [{"title": "t", "displayLink": "d", "link": "https://d", "snippet": "s", "pagemap": {}}]
    }"#;
    let resp = parse_response(body).unwrap();
    assert_eq!(resp.items.len(), 1);
}

// Web search: the SearchProvider trait and its Google Custom Search
// implementation.

pub mod google;
pub mod rate_limiter;
pub mod traits;

pub use google::GoogleSearchClient;
pub use traits::{RequestInfo, SearchItem, SearchProvider, SearchQueries, SearchResponse};

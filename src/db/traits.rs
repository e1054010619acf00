// Database trait: async interface over the result store.
//
// Methods mirror the free functions in queries.rs so callers can hold an
// `Arc<dyn Database>` and tests can keep using a bare Connection.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{ClusterAssignmentRow, RunSummary, SearchResultRow};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    /// Row counts for (keywords_serps, keyword_clusters).
    async fn row_counts(&self) -> Result<(i64, i64)>;

    // --- Search results ---

    /// Append search result rows. Returns rows written.
    async fn insert_serp_rows(&self, rows: &[SearchResultRow]) -> Result<usize>;

    /// Search rows for one keyword in one run, in rank order.
    async fn get_serp_rows(
        &self,
        search_terms: &str,
        request_timestamp: &str,
    ) -> Result<Vec<SearchResultRow>>;

    // --- Cluster assignments ---

    /// Append cluster assignment rows. Returns rows written.
    async fn insert_cluster_rows(&self, rows: &[ClusterAssignmentRow]) -> Result<usize>;

    /// Append one run's search rows and assignments in one transaction.
    /// Returns (search rows, assignments) written.
    async fn insert_run(
        &self,
        serp_rows: &[SearchResultRow],
        cluster_rows: &[ClusterAssignmentRow],
    ) -> Result<(usize, usize)>;

    /// Timestamp of the most recent clustering run.
    async fn get_latest_run_timestamp(&self) -> Result<Option<String>>;

    /// All assignments for one run, in input keyword order.
    async fn get_cluster_rows(&self, request_timestamp: &str) -> Result<Vec<ClusterAssignmentRow>>;

    /// Summaries of the most recent runs, newest first.
    async fn get_recent_runs(&self, limit: u32) -> Result<Vec<RunSummary>>;
}

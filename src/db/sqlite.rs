// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{ClusterAssignmentRow, RunSummary, SearchResultRow};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn row_counts(&self) -> Result<(i64, i64)> {
        let conn = self.conn.lock().await;
        super::queries::row_counts(&conn)
    }

    async fn insert_serp_rows(&self, rows: &[SearchResultRow]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::insert_serp_rows(&conn, rows)
    }

    async fn get_serp_rows(
        &self,
        search_terms: &str,
        request_timestamp: &str,
    ) -> Result<Vec<SearchResultRow>> {
        let conn = self.conn.lock().await;
        super::queries::get_serp_rows(&conn, search_terms, request_timestamp)
    }

    async fn insert_cluster_rows(&self, rows: &[ClusterAssignmentRow]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::insert_cluster_rows(&conn, rows)
    }

    async fn insert_run(
        &self,
        serp_rows: &[SearchResultRow],
        cluster_rows: &[ClusterAssignmentRow],
    ) -> Result<(usize, usize)> {
        let conn = self.conn.lock().await;
        super::queries::insert_run(&conn, serp_rows, cluster_rows)
    }

    async fn get_latest_run_timestamp(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_latest_run_timestamp(&conn)
    }

    async fn get_cluster_rows(&self, request_timestamp: &str) -> Result<Vec<ClusterAssignmentRow>> {
        let conn = self.conn.lock().await;
        super::queries::get_cluster_rows(&conn, request_timestamp)
    }

    async fn get_recent_runs(&self, limit: u32) -> Result<Vec<RunSummary>> {
        let conn = self.conn.lock().await;
        super::queries::get_recent_runs(&conn, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db();
        assert_eq!(db.table_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_trait_cluster_rows_roundtrip() {
        let db = test_db();
        assert!(db.get_latest_run_timestamp().await.unwrap().is_none());

        let ts = "2026-03-04 05:06:07.890";
        let rows = vec![
            ClusterAssignmentRow {
                request_timestamp: ts.to_string(),
                cluster: 0,
                search_terms: "running shoes".to_string(),
            },
            ClusterAssignmentRow {
                request_timestamp: ts.to_string(),
                cluster: -1,
                search_terms: "marathon training".to_string(),
            },
        ];
        assert_eq!(db.insert_cluster_rows(&rows).await.unwrap(), 2);

        let latest = db.get_latest_run_timestamp().await.unwrap().unwrap();
        assert_eq!(db.get_cluster_rows(&latest).await.unwrap(), rows);

        let runs = db.get_recent_runs(5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].keywords, 2);
        assert_eq!(db.row_counts().await.unwrap(), (0, 2));
    }
}

// Database schema: the two result tables.
//
// Both tables are append-only logs keyed by nothing; rows for the same run
// share a requestTimestamp. There are no indexes or migrations.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create both tables if they don't exist yet.
///
/// Idempotent; safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- One row per (keyword, result item) from a search
        CREATE TABLE IF NOT EXISTS keywords_serps (
            requestTimestamp DATETIME,
            searchTerms TEXT,
            gl TEXT,
            hl TEXT,
            totalResults INTEGER,
            link TEXT,
            displayLink TEXT,
            main_domain TEXT,
            position INTEGER,
            snippet TEXT,
            snippet_language TEXT,
            snippet_matchScore_order INTEGER,
            snippet_matchScore_token INTEGER,
            title TEXT,
            title_matchScore_order INTEGER,
            title_matchScore_token INTEGER
        );

        -- One row per keyword per clustering run (-1 = noise)
        CREATE TABLE IF NOT EXISTS keyword_clusters (
            requestTimestamp DATETIME,
            cluster INTEGER,
            searchTerms TEXT
        );
        ",
    )
    .context("Failed to create database tables")?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        conn.prepare(&format!("PRAGMA table_info({table})"))
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let names: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(names, vec!["keyword_clusters", "keywords_serps"]);
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(table_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_serps_columns() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(
            column_names(&conn, "keywords_serps"),
            vec![
                "requestTimestamp",
                "searchTerms",
                "gl",
                "hl",
                "totalResults",
                "link",
                "displayLink",
                "main_domain",
                "position",
                "snippet",
                "snippet_language",
                "snippet_matchScore_order",
                "snippet_matchScore_token",
                "title",
                "title_matchScore_order",
                "title_matchScore_token",
            ]
        );
    }

    #[test]
    fn test_clusters_columns() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(
            column_names(&conn, "keyword_clusters"),
            vec!["requestTimestamp", "cluster", "searchTerms"]
        );
    }
}

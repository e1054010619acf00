// Database queries: inserts and read-backs for both tables.
//
// All SQL lives here.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{ClusterAssignmentRow, RunSummary, SearchResultRow};

// --- keywords_serps ---

/// Append search result rows in a single transaction. Returns rows written.
pub fn insert_serp_rows(conn: &Connection, rows: &[SearchResultRow]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    write_serp_rows(&tx, rows)?;
    tx.commit()?;

    Ok(rows.len())
}

fn write_serp_rows(conn: &Connection, rows: &[SearchResultRow]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO keywords_serps (
            requestTimestamp, searchTerms, gl, hl, totalResults, link, displayLink,
            main_domain, position, snippet, snippet_language,
            snippet_matchScore_order, snippet_matchScore_token,
            title, title_matchScore_order, title_matchScore_token
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.request_timestamp,
            row.search_terms,
            row.gl,
            row.hl,
            row.total_results,
            row.link,
            row.display_link,
            row.main_domain,
            row.position,
            row.snippet,
            row.snippet_language,
            row.snippet_match_score_order,
            row.snippet_match_score_token,
            row.title,
            row.title_match_score_order,
            row.title_match_score_token,
        ])
        .with_context(|| format!("Failed to insert search row for {:?}", row.search_terms))?;
    }
    Ok(())
}

/// Search rows for one keyword in one run, in rank order.
pub fn get_serp_rows(
    conn: &Connection,
    search_terms: &str,
    request_timestamp: &str,
) -> Result<Vec<SearchResultRow>> {
    let mut stmt = conn.prepare(
        "SELECT requestTimestamp, searchTerms, gl, hl, totalResults, link, displayLink,
                main_domain, position, snippet, snippet_language,
                snippet_matchScore_order, snippet_matchScore_token,
                title, title_matchScore_order, title_matchScore_token
         FROM keywords_serps
         WHERE searchTerms = ?1 AND requestTimestamp = ?2
         ORDER BY position",
    )?;

    let rows = stmt
        .query_map(params![search_terms, request_timestamp], serp_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn serp_from_row(row: &Row<'_>) -> rusqlite::Result<SearchResultRow> {
    Ok(SearchResultRow {
        request_timestamp: row.get(0)?,
        search_terms: row.get(1)?,
        gl: row.get(2)?,
        hl: row.get(3)?,
        total_results: row.get(4)?,
        link: row.get(5)?,
        display_link: row.get(6)?,
        main_domain: row.get(7)?,
        position: row.get(8)?,
        snippet: row.get(9)?,
        snippet_language: row.get(10)?,
        snippet_match_score_order: row.get(11)?,
        snippet_match_score_token: row.get(12)?,
        title: row.get(13)?,
        title_match_score_order: row.get(14)?,
        title_match_score_token: row.get(15)?,
    })
}

// --- keyword_clusters ---

/// Append cluster assignments in a single transaction. Returns rows written.
pub fn insert_cluster_rows(conn: &Connection, rows: &[ClusterAssignmentRow]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    write_cluster_rows(&tx, rows)?;
    tx.commit()?;

    Ok(rows.len())
}

fn write_cluster_rows(conn: &Connection, rows: &[ClusterAssignmentRow]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO keyword_clusters (requestTimestamp, cluster, searchTerms)
         VALUES (?1, ?2, ?3)",
    )?;
    for row in rows {
        stmt.execute(params![row.request_timestamp, row.cluster, row.search_terms])?;
    }
    Ok(())
}

// --- whole runs ---

/// Append one run's search rows and assignments atomically.
///
/// Either both sets land or neither does. Returns (search rows, assignments).
pub fn insert_run(
    conn: &Connection,
    serp_rows: &[SearchResultRow],
    cluster_rows: &[ClusterAssignmentRow],
) -> Result<(usize, usize)> {
    let tx = conn.unchecked_transaction()?;
    write_serp_rows(&tx, serp_rows).context("Failed to store search results")?;
    write_cluster_rows(&tx, cluster_rows).context("Failed to store cluster assignments")?;
    tx.commit()?;

    Ok((serp_rows.len(), cluster_rows.len()))
}

/// Timestamp of the most recent clustering run, if any.
pub fn get_latest_run_timestamp(conn: &Connection) -> Result<Option<String>> {
    let ts: Option<Option<String>> = conn
        .query_row("SELECT MAX(requestTimestamp) FROM keyword_clusters", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(ts.flatten())
}

/// Assignments for one run, in insertion (= input keyword) order.
pub fn get_cluster_rows(
    conn: &Connection,
    request_timestamp: &str,
) -> Result<Vec<ClusterAssignmentRow>> {
    let mut stmt = conn.prepare(
        "SELECT requestTimestamp, cluster, searchTerms
         FROM keyword_clusters
         WHERE requestTimestamp = ?1
         ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map(params![request_timestamp], |row| {
            Ok(ClusterAssignmentRow {
                request_timestamp: row.get(0)?,
                cluster: row.get(1)?,
                search_terms: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Most recent runs first.
pub fn get_recent_runs(conn: &Connection, limit: u32) -> Result<Vec<RunSummary>> {
    let mut stmt = conn.prepare(
        "SELECT requestTimestamp,
                COUNT(*),
                COUNT(DISTINCT CASE WHEN cluster >= 0 THEN cluster END),
                SUM(CASE WHEN cluster = -1 THEN 1 ELSE 0 END)
         FROM keyword_clusters
         GROUP BY requestTimestamp
         ORDER BY requestTimestamp DESC
         LIMIT ?1",
    )?;

    let runs = stmt
        .query_map(params![limit], |row| {
            Ok(RunSummary {
                request_timestamp: row.get(0)?,
                keywords: row.get(1)?,
                clusters: row.get(2)?,
                noise: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(runs)
}

/// Row counts for (keywords_serps, keyword_clusters).
pub fn row_counts(conn: &Connection) -> Result<(i64, i64)> {
    let serps: i64 = conn.query_row("SELECT COUNT(*) FROM keywords_serps", [], |row| row.get(0))?;
    let clusters: i64 =
        conn.query_row("SELECT COUNT(*) FROM keyword_clusters", [], |row| row.get(0))?;
    Ok((serps, clusters))
}

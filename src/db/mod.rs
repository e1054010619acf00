// Database layer: SQLite storage for search results and cluster assignments.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever KWCLUSTER_DB_PATH points
// (defaults to ./data/keywords.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use traits::Database;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::pipeline::ClusteringRun;

/// Open (or create) the database and create the tables.
///
/// Called by `kwcluster init` and by any command that writes results.
pub fn initialize(db_path: &str) -> Result<Connection> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `kwcluster init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Initialize the SQLite database and wrap it behind the Database trait.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    let conn = initialize(db_path)?;
    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Open an existing SQLite database behind the Database trait.
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    let conn = open(db_path)?;
    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Persist one clustering run, search rows and assignments together.
///
/// Returns (search rows written, assignment rows written).
pub async fn record_run(db: &dyn Database, run: &ClusteringRun) -> Result<(usize, usize)> {
    let (serps, clusters) = db
        .insert_run(&run.serp_rows(), &run.cluster_rows())
        .await
        .with_context(|| format!("Failed to record run {}", run.request_timestamp))?;

    info!(
        request_timestamp = %run.request_timestamp,
        serp_rows = serps,
        cluster_rows = clusters,
        "Recorded clustering run"
    );

    Ok((serps, clusters))
}

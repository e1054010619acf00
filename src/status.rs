// System status display: DB stats, last run, model availability.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::embedding::download;
use crate::embedding::ModelVariant;

/// Display system status to the terminal.
pub async fn show(db: Option<&Arc<dyn Database>>, config: &Config) -> Result<()> {
    // Models
    for variant in ModelVariant::ALL {
        let present = download::model_files_present(&config.model_dir, variant);
        let marker = if variant == config.model_variant { "*" } else { " " };
        println!(
            "Model {}{}: {}",
            variant,
            marker,
            if present { "downloaded" } else { "not downloaded" }
        );
    }
    println!(
        "Search credentials: {}",
        if config.require_search().is_ok() { "configured" } else { "missing" }
    );

    let Some(db) = db else {
        println!("Database: not initialized");
        println!("\nRun `kwcluster init` to set up the database.");
        return Ok(());
    };

    let file_size = std::fs::metadata(Path::new(&config.db_path))
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    let (serps, clusters) = db.row_counts().await?;
    println!("Stored rows: {serps} search results, {clusters} cluster assignments");

    match db.get_recent_runs(1).await?.first() {
        Some(run) => println!(
            "Last run: {} ({} keywords, {} clusters)",
            run.request_timestamp, run.keywords, run.clusters
        ),
        None => {
            println!("Last run: never");
            println!("  Run `kwcluster cluster <keywords>...` to create one");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}

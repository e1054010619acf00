use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use kwcluster::config::Config;
use kwcluster::db::Database;
use kwcluster::embedding::{download, ModelVariant};
use kwcluster::pipeline::{FeatureMode, PipelineOptions, SemanticClustering, UnresolvedPolicy};

/// kwcluster: group search keywords into semantic clusters.
///
/// Searches each keyword, compares it with its top snippet using a local
/// BERT model, and clusters the results with DBSCAN.
#[derive(Parser)]
#[command(name = "kwcluster", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Download an ONNX embedding model
    DownloadModel {
        /// Which model to download (bert or distilbert); defaults to KWCLUSTER_MODEL
        #[arg(long)]
        model: Option<ModelVariant>,
    },

    /// Search, embed, and cluster keywords
    Cluster {
        /// Keywords to cluster
        keywords: Vec<String>,

        /// Read additional keywords from a file, one per line
        #[arg(long)]
        file: Option<PathBuf>,

        /// Search interface language
        #[arg(long, default_value = "en")]
        hl: String,

        /// Search country
        #[arg(long, default_value = "us")]
        gl: String,

        /// DBSCAN neighbourhood radius (overrides KWCLUSTER_EPSILON)
        #[arg(long)]
        epsilon: Option<f64>,

        /// DBSCAN points per core (overrides KWCLUSTER_MIN_POINTS)
        #[arg(long)]
        min_points: Option<usize>,

        /// Feature per keyword: similarity or embedding (overrides KWCLUSTER_FEATURE_MODE)
        #[arg(long)]
        features: Option<FeatureMode>,

        /// Failed keywords: sentinel or drop (overrides KWCLUSTER_UNRESOLVED)
        #[arg(long)]
        unresolved: Option<UnresolvedPolicy>,

        /// Number of searches in flight at once (default: 1)
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Don't write results to the database
        #[arg(long)]
        no_save: bool,
    },

    /// Show stored cluster assignments
    Report {
        /// Run timestamp to show (default: latest)
        #[arg(long)]
        run: Option<String>,

        /// Number of recent runs to list
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Show system status (DB stats, last run, models)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kwcluster=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing kwcluster database...");
            let config = Config::load()?;
            let db = kwcluster::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  1. Set GOOGLE_API_KEY and GOOGLE_CSE_ID in your .env file");
            println!("  2. Run: kwcluster download-model");
        }

        Commands::DownloadModel { model } => {
            let config = Config::load()?;
            let variant = model.unwrap_or(config.model_variant);
            download::download_model(&config.model_dir, variant).await?;
            println!(
                "\n{}",
                format!(
                    "Model ready in {}",
                    download::variant_dir(&config.model_dir, variant).display()
                )
                .bold()
            );
        }

        Commands::Cluster {
            keywords,
            file,
            hl,
            gl,
            epsilon,
            min_points,
            features,
            unresolved,
            concurrency,
            no_save,
        } => {
            let mut config = Config::load()?;
            apply_cluster_overrides(
                &mut config,
                ClusterOverrides {
                    features,
                    unresolved,
                    epsilon,
                    min_points,
                },
            );

            let keywords = collect_keywords(keywords, file.as_deref())?;
            if keywords.is_empty() {
                anyhow::bail!("No keywords given. Pass them as arguments or with --file.");
            }

            let db = if no_save {
                None
            } else {
                Some(kwcluster::db::initialize_sqlite(&config.db_path)?)
            };

            let mut pipeline = SemanticClustering::new(&config)?;
            pipeline.set_options(PipelineOptions {
                concurrency,
                ..pipeline.options()
            });

            println!(
                "Clustering {} keywords ({} model, {} features)...",
                keywords.len(),
                config.model_variant,
                config.feature_mode
            );

            let run = pipeline.run(&keywords, &hl, &gl).await?;
            kwcluster::output::terminal::display_run(&run);

            let unresolved = run.unresolved();
            if !unresolved.is_empty() {
                warn!(count = unresolved.len(), "Some keywords could not be resolved");
                println!(
                    "{}",
                    format!("{} keyword(s) unresolved: {}", unresolved.len(), unresolved.join(", "))
                        .yellow()
                );
            }

            if let Some(db) = db {
                let (serps, clusters) = kwcluster::db::record_run(db.as_ref(), &run).await?;
                println!(
                    "Saved {serps} search rows and {clusters} assignments to {} (run {})",
                    config.db_path, run.request_timestamp
                );
            }
        }

        Commands::Report { run, limit } => {
            let config = Config::load()?;
            let db = kwcluster::db::open_sqlite(&config.db_path)?;

            let timestamp = match run {
                Some(ts) => Some(ts),
                None => db.get_latest_run_timestamp().await?,
            };

            match timestamp {
                Some(ts) => {
                    let rows = db.get_cluster_rows(&ts).await?;
                    if rows.is_empty() {
                        println!("No assignments found for run {ts}.");
                    } else {
                        kwcluster::output::terminal::display_assignments(&rows);
                    }
                }
                None => {
                    println!("No cluster assignments stored yet. Run `kwcluster cluster` first.");
                    return Ok(());
                }
            }

            let runs = db.get_recent_runs(limit).await?;
            kwcluster::output::terminal::display_runs(&runs);
        }

        Commands::Status => {
            let config = Config::load()?;
            let db: Option<Arc<dyn Database>> = if std::path::Path::new(&config.db_path).exists() {
                Some(kwcluster::db::open_sqlite(&config.db_path)?)
            } else {
                None
            };
            kwcluster::status::show(db.as_ref(), &config).await?;
        }
    }

    Ok(())
}

/// `cluster` flags that take precedence over the environment.
struct ClusterOverrides {
    features: Option<FeatureMode>,
    unresolved: Option<UnresolvedPolicy>,
    epsilon: Option<f64>,
    min_points: Option<usize>,
}

/// Fold CLI flags into `config` so they are validated with it, before any
/// model is loaded.
fn apply_cluster_overrides(config: &mut Config, overrides: ClusterOverrides) {
    if let Some(mode) = overrides.features {
        config.feature_mode = mode;
    }
    if let Some(policy) = overrides.unresolved {
        config.unresolved = policy;
    }
    if let Some(epsilon) = overrides.epsilon {
        config.dbscan.epsilon = epsilon;
    }
    if let Some(min_points) = overrides.min_points {
        config.dbscan.min_points = min_points;
    }
}

/// Merge CLI keywords with those from `file`, trimming blanks and duplicates
/// while keeping first-seen order.
fn collect_keywords(mut keywords: Vec<String>, file: Option<&std::path::Path>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keywords from {}", path.display()))?;
        keywords.extend(contents.lines().map(str::to_string));
    }

    let mut seen = std::collections::HashSet::new();
    Ok(keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect())
}

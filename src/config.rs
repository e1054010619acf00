use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::clustering::DbscanParams;
use crate::embedding::download;
use crate::embedding::models::ModelVariant;
use crate::pipeline::{FeatureMode, UnresolvedPolicy};
use crate::search::rate_limiter::RateLimiter;

/// Central configuration loaded from environment variables.
///
/// Credentials come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google API key for the Custom Search JSON API
    pub api_key: String,
    /// Programmable Search Engine identifier (the `cx` parameter)
    pub search_engine_id: String,
    pub db_path: String,
    pub model_variant: ModelVariant,
    /// Base directory holding one subdirectory per model variant
    pub model_dir: PathBuf,
    pub feature_mode: FeatureMode,
    pub unresolved: UnresolvedPolicy,
    pub dbscan: DbscanParams,
    /// Maximum search requests per second
    pub search_qps: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the search credentials lack defaults, and those are checked
    /// lazily by `require_search` so `init` and `status` work without them.
    pub fn load() -> Result<Self> {
        let model_variant = match env::var("KWCLUSTER_MODEL") {
            Ok(name) => name.parse()?,
            Err(_) => ModelVariant::Bert,
        };

        let feature_mode = match env::var("KWCLUSTER_FEATURE_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => FeatureMode::default(),
        };

        let unresolved = match env::var("KWCLUSTER_UNRESOLVED") {
            Ok(policy) => policy.parse()?,
            Err(_) => UnresolvedPolicy::default(),
        };

        let defaults = DbscanParams::default();
        let dbscan = DbscanParams {
            epsilon: parse_var("KWCLUSTER_EPSILON")?.unwrap_or(defaults.epsilon),
            min_points: parse_var("KWCLUSTER_MIN_POINTS")?.unwrap_or(defaults.min_points),
        };

        let model_dir = env::var("KWCLUSTER_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download::default_model_dir());

        Ok(Self {
            api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            search_engine_id: env::var("GOOGLE_CSE_ID").unwrap_or_default(),
            db_path: env::var("KWCLUSTER_DB_PATH")
                .unwrap_or_else(|_| "./data/keywords.db".to_string()),
            model_variant,
            model_dir,
            feature_mode,
            unresolved,
            dbscan,
            search_qps: parse_var("KWCLUSTER_SEARCH_QPS")?.unwrap_or(1.0),
        })
    }

    /// Directory holding the files for the configured model variant.
    pub fn variant_model_dir(&self) -> PathBuf {
        download::variant_dir(&self.model_dir, self.model_variant)
    }

    /// Check that the Custom Search credentials are configured.
    /// Call this before any operation that queries the search API.
    pub fn require_search(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!(
                "GOOGLE_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        if self.search_engine_id.is_empty() {
            anyhow::bail!(
                "GOOGLE_CSE_ID not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        RateLimiter::interval_for(self.search_qps).context("Invalid KWCLUSTER_SEARCH_QPS")?;
        Ok(())
    }

    /// Check that the configured model's files are on disk.
    pub fn require_model(&self) -> Result<()> {
        if !download::model_files_present(&self.model_dir, self.model_variant) {
            anyhow::bail!(
                "{} model files not found in {}\n\
                 Run `kwcluster download-model --model {}` to download them.",
                self.model_variant,
                self.variant_model_dir().display(),
                self.model_variant
            );
        }
        Ok(())
    }
}

/// Parse an optional numeric env var, failing loudly on garbage values.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {name}: {raw:?}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

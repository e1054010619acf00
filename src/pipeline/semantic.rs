// SemanticClustering: the keyword clustering orchestrator.
//
// For every keyword: search, take the top snippet, turn (keyword, snippet)
// into a feature with the embedder. Then cluster all features in one DBSCAN
// pass and map the labels back onto the keywords.
//
// Searches may run a few at a time, but results are always consumed in input
// order, so feature i belongs to the i-th resolved keyword.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::rows::build_rows;
use super::{FeatureMode, UnresolvedPolicy, UNRESOLVED_LABEL};
use crate::clustering::DensityClusterer;
use crate::config::Config;
use crate::db::models::{ClusterAssignmentRow, SearchResultRow, TIMESTAMP_FORMAT};
use crate::embedding::onnx::l2_normalize;
use crate::embedding::{OnnxEmbedder, TextEmbedder};
use crate::search::{GoogleSearchClient, SearchProvider, SearchResponse};

/// Knobs that shape a run but not its collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub feature_mode: FeatureMode,
    pub unresolved: UnresolvedPolicy,
    /// Searches in flight at once; 1 is fully sequential
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            feature_mode: FeatureMode::default(),
            unresolved: UnresolvedPolicy::default(),
            concurrency: 1,
        }
    }
}

/// What happened to one input keyword.
#[derive(Debug, Clone)]
pub struct KeywordOutcome {
    pub keyword: String,
    /// The search response, when the search succeeded
    pub response: Option<SearchResponse>,
    /// The cluster label, None when no feature could be computed
    pub label: Option<i32>,
}

impl KeywordOutcome {
    pub fn is_resolved(&self) -> bool {
        self.label.is_some()
    }
}

/// Everything one `run` produced, in input keyword order.
#[derive(Debug, Clone)]
pub struct ClusteringRun {
    pub request_timestamp: String,
    pub hl: String,
    pub gl: String,
    pub policy: UnresolvedPolicy,
    pub outcomes: Vec<KeywordOutcome>,
}

impl ClusteringRun {
    /// Labels as `cluster_keywords` reports them under this run's policy.
    pub fn labels(&self) -> Vec<i32> {
        match self.policy {
            UnresolvedPolicy::Sentinel => self
                .outcomes
                .iter()
                .map(|o| o.label.unwrap_or(UNRESOLVED_LABEL))
                .collect(),
            UnresolvedPolicy::Drop => self.outcomes.iter().filter_map(|o| o.label).collect(),
        }
    }

    /// Keywords that produced no feature.
    pub fn unresolved(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_resolved())
            .map(|o| o.keyword.as_str())
            .collect()
    }

    /// keywords_serps rows for every successful search.
    pub fn serp_rows(&self) -> Vec<SearchResultRow> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.response.as_ref().map(|resp| {
                    build_rows(&self.request_timestamp, &o.keyword, &self.hl, &self.gl, resp)
                })
            })
            .flatten()
            .collect()
    }

    /// keyword_clusters rows, one per keyword the policy keeps.
    pub fn cluster_rows(&self) -> Vec<ClusterAssignmentRow> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                let cluster = match (o.label, self.policy) {
                    (Some(label), _) => label,
                    (None, UnresolvedPolicy::Sentinel) => UNRESOLVED_LABEL,
                    (None, UnresolvedPolicy::Drop) => return None,
                };
                Some(ClusterAssignmentRow {
                    request_timestamp: self.request_timestamp.clone(),
                    cluster,
                    search_terms: o.keyword.clone(),
                })
            })
            .collect()
    }
}

/// Groups keywords by how their top search snippet relates to them.
///
/// Owns its search client and embedding model; both are released when the
/// instance is dropped, so differently configured instances can coexist.
pub struct SemanticClustering {
    search: Box<dyn SearchProvider>,
    embedder: Box<dyn TextEmbedder>,
    clusterer: DensityClusterer,
    options: PipelineOptions,
}

impl SemanticClustering {
    /// Build the production pipeline from configuration.
    ///
    /// Validates credentials and clustering parameters before loading the
    /// model, so a bad config never pays for model loading.
    pub fn new(config: &Config) -> Result<Self> {
        config.require_search()?;
        let clusterer = DensityClusterer::new(config.dbscan)?;
        config.require_model()?;

        let embedder = OnnxEmbedder::load(config.model_variant, &config.variant_model_dir())
            .with_context(|| format!("Failed to load {} model", config.model_variant))?;
        let search = GoogleSearchClient::new(
            config.api_key.clone(),
            config.search_engine_id.clone(),
            config.search_qps,
        )?;

        info!(
            model = %config.model_variant,
            feature_mode = %config.feature_mode,
            unresolved = %config.unresolved,
            "Semantic clustering pipeline ready"
        );

        Ok(Self::with_components(
            Box::new(search),
            Box::new(embedder),
            clusterer,
            PipelineOptions {
                feature_mode: config.feature_mode,
                unresolved: config.unresolved,
                concurrency: 1,
            },
        ))
    }

    /// Assemble a pipeline from already-built parts.
    pub fn with_components(
        search: Box<dyn SearchProvider>,
        embedder: Box<dyn TextEmbedder>,
        clusterer: DensityClusterer,
        options: PipelineOptions,
    ) -> Self {
        Self {
            search,
            embedder,
            clusterer,
            options,
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn set_options(&mut self, options: PipelineOptions) {
        self.options = options;
    }

    /// Cluster `keywords` and return one label per keyword (see `UnresolvedPolicy`).
    pub async fn cluster_keywords(&self, keywords: &[String], hl: &str, gl: &str) -> Result<Vec<i32>> {
        Ok(self.run(keywords, hl, gl).await?.labels())
    }

    /// Full run: search every keyword, build features, cluster once.
    pub async fn run(&self, keywords: &[String], hl: &str, gl: &str) -> Result<ClusteringRun> {
        let request_timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        info!(
            keywords = keywords.len(),
            hl = hl,
            gl = gl,
            concurrency = self.options.concurrency.max(1),
            "Searching keywords"
        );

        // buffered() keeps input order no matter which search finishes first.
        let responses: Vec<Option<SearchResponse>> = stream::iter(keywords)
            .map(|keyword| self.search.try_search(keyword, hl, gl))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut features = Vec::new();
        let mut feature_owner = Vec::new();

        for (i, (keyword, response)) in keywords.iter().zip(&responses).enumerate() {
            let Some(response) = response else {
                continue;
            };
            let Some(snippet) = response.top_snippet() else {
                warn!(keyword = keyword.as_str(), "No usable snippet in search results, skipping keyword");
                continue;
            };

            match self.feature(keyword, snippet).await {
                Ok(feature) => {
                    debug!(keyword = keyword.as_str(), dim = feature.len(), "Computed feature");
                    features.push(feature);
                    feature_owner.push(i);
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(keyword = keyword.as_str(), error = %error, "Embedding failed, skipping keyword");
                }
            }
        }

        let labels = self.clusterer.cluster(&features)?;

        let mut outcomes: Vec<KeywordOutcome> = keywords
            .iter()
            .zip(responses)
            .map(|(keyword, response)| KeywordOutcome {
                keyword: keyword.clone(),
                response,
                label: None,
            })
            .collect();
        for (&owner, &label) in feature_owner.iter().zip(&labels) {
            outcomes[owner].label = Some(label);
        }

        let run = ClusteringRun {
            request_timestamp,
            hl: hl.to_string(),
            gl: gl.to_string(),
            policy: self.options.unresolved,
            outcomes,
        };

        info!(
            resolved = feature_owner.len(),
            unresolved = keywords.len() - feature_owner.len(),
            clusters = crate::clustering::dbscan::count_clusters(&labels),
            "Clustering complete"
        );

        Ok(run)
    }

    /// Feature for one (keyword, top snippet) pair under the configured mode.
    ///
    /// A NaN or infinite component is an embedding failure, not a feature.
    async fn feature(&self, keyword: &str, snippet: &str) -> Result<Vec<f64>> {
        let feature = match self.options.feature_mode {
            FeatureMode::Similarity => {
                let similarity = self.embedder.similarity(keyword, snippet).await?;
                vec![similarity]
            }
            FeatureMode::Embedding => {
                let combined = format!("{keyword} {snippet}");
                let embedding = self.embedder.embed(&combined).await?;
                l2_normalize(&embedding)
            }
        };

        if feature.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("Embedding produced a non-finite value");
        }
        Ok(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::DbscanParams;
    use crate::embedding::ModelVariant;

    fn config(dbscan: DbscanParams) -> Config {
        Config {
            api_key: "key".to_string(),
            search_engine_id: "cx".to_string(),
            db_path: ":memory:".to_string(),
            model_variant: ModelVariant::Bert,
            model_dir: std::env::temp_dir().join("kwcluster-semantic-test-nonexistent"),
            feature_mode: FeatureMode::Similarity,
            unresolved: UnresolvedPolicy::Sentinel,
            dbscan,
            search_qps: 1.0,
        }
    }

    #[test]
    fn test_bad_dbscan_params_rejected_before_model_lookup() {
        let err = match SemanticClustering::new(&config(DbscanParams {
            epsilon: 0.5,
            min_points: 1,
        })) {
            Ok(_) => panic!("min_points 1 should be rejected"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("min_points"), "got: {err}");
    }

    #[test]
    fn test_valid_params_reach_model_lookup() {
        let err = match SemanticClustering::new(&config(DbscanParams::default())) {
            Ok(_) => panic!("model files don't exist"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("download-model"), "got: {err}");
    }
}

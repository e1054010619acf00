// Keyword clustering pipeline: search, embed, cluster.

pub mod rows;
pub mod semantic;

use std::fmt;
use std::str::FromStr;

pub use semantic::{ClusteringRun, KeywordOutcome, PipelineOptions, SemanticClustering};

/// Label emitted for a keyword whose search or embedding failed, when the
/// policy keeps it in the output.
pub const UNRESOLVED_LABEL: i32 = -2;

/// What each keyword contributes to the clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeatureMode {
    /// One scalar: cosine similarity between keyword and top snippet
    #[default]
    Similarity,
    /// The unit-length embedding of "<keyword> <top snippet>"
    Embedding,
}

impl FeatureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureMode::Similarity => "similarity",
            FeatureMode::Embedding => "embedding",
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeatureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "similarity" => Ok(FeatureMode::Similarity),
            "embedding" => Ok(FeatureMode::Embedding),
            other => anyhow::bail!(
                "Invalid feature mode {other:?}. Choose between 'similarity' and 'embedding'."
            ),
        }
    }
}

/// How keywords that produced no feature show up in the labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Emit `UNRESOLVED_LABEL` in place; output length equals input length
    #[default]
    Sentinel,
    /// Leave the keyword out; later labels shift left
    Drop,
}

impl UnresolvedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedPolicy::Sentinel => "sentinel",
            UnresolvedPolicy::Drop => "drop",
        }
    }
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnresolvedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentinel" => Ok(UnresolvedPolicy::Sentinel),
            "drop" => Ok(UnresolvedPolicy::Drop),
            other => anyhow::bail!(
                "Invalid unresolved policy {other:?}. Choose between 'sentinel' and 'drop'."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_mode_parse() {
        assert_eq!("Embedding".parse::<FeatureMode>().unwrap(), FeatureMode::Embedding);
        assert_eq!("similarity".parse::<FeatureMode>().unwrap(), FeatureMode::Similarity);
        assert!("vector".parse::<FeatureMode>().is_err());
    }

    #[test]
    fn test_unresolved_policy_parse() {
        assert_eq!("drop".parse::<UnresolvedPolicy>().unwrap(), UnresolvedPolicy::Drop);
        assert_eq!(" SENTINEL".parse::<UnresolvedPolicy>().unwrap(), UnresolvedPolicy::Sentinel);
        assert!("skip".parse::<UnresolvedPolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(FeatureMode::default(), FeatureMode::Similarity);
        assert_eq!(UnresolvedPolicy::default(), UnresolvedPolicy::Sentinel);
    }
}

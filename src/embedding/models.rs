// Supported pretrained model variants.
//
// Exactly two variants exist: the full BERT base model and its distilled
// sibling. Both are uncased and produce 768-dimensional token vectors, but
// DistilBERT drops the segment embeddings so its ONNX graph has no
// token_type_ids input.

use std::fmt;
use std::str::FromStr;

/// A pretrained contextual language model the embedder can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// bert-base-uncased, larger and slower
    Bert,
    /// distilbert-base-uncased, ~40% smaller and ~60% faster
    DistilBert,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Bert, ModelVariant::DistilBert];

    /// Short name used in config, the CLI, and on-disk directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Bert => "bert",
            ModelVariant::DistilBert => "distilbert",
        }
    }

    /// HuggingFace repo hosting the ONNX export and tokenizer.
    pub fn hf_repo(&self) -> &'static str {
        match self {
            ModelVariant::Bert => "Xenova/bert-base-uncased",
            ModelVariant::DistilBert => "Xenova/distilbert-base-uncased",
        }
    }

    /// Width of the last hidden state.
    pub fn hidden_size(&self) -> usize {
        768
    }

    /// Whether the ONNX graph expects a `token_type_ids` input.
    pub fn uses_token_type_ids(&self) -> bool {
        matches!(self, ModelVariant::Bert)
    }

    /// Approximate download size, shown before fetching.
    pub fn approx_size(&self) -> &'static str {
        match self {
            ModelVariant::Bert => "~440 MB",
            ModelVariant::DistilBert => "~265 MB",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bert" => Ok(ModelVariant::Bert),
            "distilbert" => Ok(ModelVariant::DistilBert),
            other => anyhow::bail!(
                "Invalid model variant {other:?}. Choose between 'bert' and 'distilbert'."
            ),
        }
    }
}

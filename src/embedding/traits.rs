// Text embedder trait: lets the orchestrator run against the local ONNX
// model in production and against a deterministic fake in tests.

use anyhow::Result;
use async_trait::async_trait;

use super::onnx::cosine_similarity;

#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// Cosine similarity between the embeddings of two texts, in [-1, 1].
    ///
    /// Each text is embedded independently.
    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        let va = self.embed(a).await?;
        let vb = self.embed(b).await?;
        Ok(cosine_similarity(&va, &vb))
    }
}

// Local ONNX text embedder for BERT-family models.
//
// A text is tokenized (special tokens added), run through the encoder, and
// the last hidden state is mean-pooled across the sequence using the
// attention mask. Nothing is fine-tuned; the vectors come straight from the
// pretrained checkpoint.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::download::{MODEL_FILE, TOKENIZER_FILE};
use super::models::ModelVariant;
use super::traits::TextEmbedder;

/// BERT position embeddings stop at 512; longer inputs are truncated.
const MAX_SEQUENCE_LEN: usize = 512;

/// Text embedder backed by an ONNX session.
///
/// Session and tokenizer are loaded once per instance and shared with
/// spawn_blocking through Arc. `Session::run` takes `&mut self`, hence the Mutex.
pub struct OnnxEmbedder {
    variant: ModelVariant,
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxEmbedder {
    /// Parse the variant name and load its model from `base_dir/<variant>/`.
    ///
    /// An unknown variant name fails before anything touches the filesystem.
    pub fn from_name(variant: &str, base_dir: &Path) -> Result<Self> {
        let variant: ModelVariant = variant.parse()?;
        Self::load(variant, &super::download::variant_dir(base_dir, variant))
    }

    /// Load the ONNX model and tokenizer for `variant` from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Call `download::download_model()` first if they don't exist.
    pub fn load(variant: ModelVariant, model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `kwcluster download-model --model {}` to download it.",
                model_path.display(),
                variant
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `kwcluster download-model --model {}` to download it.",
                tokenizer_path.display(),
                variant
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        // A single sequence never needs padding.
        tokenizer.with_padding(None);

        debug!(variant = %variant, "Loaded ONNX embedding model from {}", model_dir.display());

        Ok(Self {
            variant,
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }
}

#[async_trait]
impl TextEmbedder for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let variant = self.variant;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, variant, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Tokenize, run inference, and mean-pool one text.
fn embed_sync(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    variant: ModelVariant,
    text: &str,
) -> Result<Vec<f64>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encoding.get_ids().len();
    let hidden = variant.hidden_size();
    if seq_len == 0 {
        return Ok(vec![0.0; hidden]);
    }

    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();

    let shape = [1_i64, seq_len as i64];
    let input_ids_tensor =
        Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
        .context("Failed to create attention_mask tensor")?;

    // Output 0 is last_hidden_state: [1, seq_len, hidden]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let run = if variant.uses_token_type_ids() {
            let token_type_ids_tensor = Tensor::from_array((shape, vec![0_i64; seq_len]))
                .context("Failed to create token_type_ids tensor")?;
            session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
        } else {
            session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            })
        };
        let outputs = run.context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    if hidden_states.len() != seq_len * hidden {
        anyhow::bail!(
            "Unexpected hidden state size {} (expected {} tokens x {})",
            hidden_states.len(),
            seq_len,
            hidden
        );
    }

    let embedding = mean_pool(&hidden_states, &attention_mask, hidden);

    debug!(tokens = seq_len, dim = hidden, "Computed text embedding");

    Ok(embedding)
}

/// Average token vectors weighted by the attention mask.
///
/// `hidden_states` is a row-major `[mask.len(), dim]` matrix.
pub fn mean_pool(hidden_states: &[f32], mask: &[i64], dim: usize) -> Vec<f64> {
    let mut sum = vec![0.0_f64; dim];
    let mut mask_sum = 0.0_f64;

    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let weight = m as f64;
        mask_sum += weight;
        let row = &hidden_states[j * dim..(j + 1) * dim];
        for (acc, &val) in sum.iter_mut().zip(row) {
            *acc += val as f64 * weight;
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }

    sum
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Mismatched lengths, empty vectors, and zero vectors give 0.0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < f64::EPSILON {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_fails_without_touching_disk() {
        let missing = std::env::temp_dir().join("kwcluster-onnx-test-nonexistent");
        let err = match OnnxEmbedder::from_name("gpt2", &missing) {
            Ok(_) => panic!("gpt2 should be rejected"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("Invalid model variant"), "got: {err}");
        assert!(!missing.exists());
    }

    #[test]
    fn test_known_variant_without_files_reports_download_hint() {
        let missing = std::env::temp_dir().join("kwcluster-onnx-test-nonexistent");
        let err = match OnnxEmbedder::from_name("distilbert", &missing) {
            Ok(_) => panic!("load should fail without model files"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("download-model"), "got: {err}");
    }

    #[test]
    fn test_mean_pool_ignores_masked_tokens() {
        // Three tokens of width 2; the last is padding
        let hidden = vec![1.0_f32, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = vec![1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 2);
        assert!((pooled[0] - 2.0).abs() < 1e-10);
        assert!((pooled[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let hidden = vec![5.0_f32, 5.0];
        let pooled = mean_pool(&hidden, &[0], 2);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine_identical() {
        let a = vec![0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite_is_negative_one() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = vec![1.0, 3.0, -2.0, 0.5];
        let b = vec![2.0, -1.0, 4.0, 0.0];
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-10);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-10);
        assert!((v[1] - 0.8).abs() < 1e-10);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}

// Model download helper for the ONNX embedding models.
//
// Each variant lives in its own subdirectory of the model dir
// (~/.local/share/kwcluster/models/<variant>/ on Linux) so both can be
// installed side by side and persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::models::ModelVariant;

/// Path of the ONNX graph inside the HuggingFace repo.
const HF_MODEL_FILE: &str = "onnx/model.onnx";

/// Local file names inside a variant directory.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/kwcluster/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kwcluster")
        .join("models")
}

/// Subdirectory within the model dir for one variant.
pub fn variant_dir(base: &Path, variant: ModelVariant) -> PathBuf {
    base.join(variant.as_str())
}

/// Check whether both files for a variant exist.
pub fn model_files_present(base: &Path, variant: ModelVariant) -> bool {
    let dir = variant_dir(base, variant);
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

fn hf_url(variant: ModelVariant, file: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", variant.hf_repo(), file)
}

/// Download the ONNX model and tokenizer for one variant.
///
/// Skips files that already exist and creates directories as needed.
pub async fn download_model(base: &Path, variant: ModelVariant) -> Result<()> {
    let dir = variant_dir(base, variant);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\n{} ({}):", variant, variant.hf_repo());

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!(variant = %variant, "Tokenizer already exists, skipping");
        println!("  {} (already exists)", TOKENIZER_FILE);
    } else {
        println!("  Downloading {}...", TOKENIZER_FILE);
        download_file(&hf_url(variant, TOKENIZER_FILE), &tokenizer_path, false).await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!(variant = %variant, "Model already exists, skipping");
        println!("  {} (already exists)", MODEL_FILE);
    } else {
        println!("  Downloading {} ({})...", MODEL_FILE, variant.approx_size());
        download_file(&hf_url(variant, HF_MODEL_FILE), &model_path, true).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .expect("valid template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .expect("valid template"),
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    // `dest` only ever holds a complete file
    let partial = dest.with_extension("part");
    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

// Text embedding: pretrained BERT-family models run locally via ONNX.
//
// The TextEmbedder trait is the seam the orchestrator depends on;
// OnnxEmbedder is the production implementation.

pub mod download;
pub mod models;
pub mod onnx;
pub mod traits;

pub use models::ModelVariant;
pub use onnx::{cosine_similarity, OnnxEmbedder};
pub use traits::TextEmbedder;

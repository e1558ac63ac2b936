// embeddings/ — Local sentence embedding using candle (pure Rust).
//
// Provides:
// - Model download + SHA256 verification
// - BERT inference with mean pooling
// - Lazy, load-once provider shared by the whole process
// - Field text normalization

pub mod download;
pub mod engine;
pub mod provider;
pub mod text_prep;

#[cfg(test)]
pub mod testing;

pub use provider::EmbeddingProvider;

/// Text-to-vector capability. Implementations must be deterministic and
/// return exactly `dims()` values for non-blank input.
pub trait Embedder: Send + Sync {
    fn dims(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

// Embeddings module
// Text chunking, profile field extraction and the embedding providers

pub mod chunking;
pub mod hashing;
pub mod ollama;
pub mod profile;

use std::sync::Arc;

use crate::Result;
use crate::config::{EmbeddingConfig, EmbeddingProvider};

pub use chunking::{ChunkingConfig, chunk_text, count_words, split_sentences};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;
pub use profile::{TextField, extract_text_fields};

/// Deterministic text to fixed-length vector function.
///
/// Implementations are not required to normalize their output; the index
/// manager normalizes and checks the dimension of everything it receives.
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Build the embedder selected by the configuration
#[inline]
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(
            config.dimension as usize,
        ))),
    }
}

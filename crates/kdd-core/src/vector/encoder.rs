//! Text encoder contract and the fastembed adapter.
//!
//! The core consumes the neural model only through `(texts) → vectors`.
//! The model is loaded lazily on construction and kept resident; the first
//! call may be slower while weights are fetched.

use crate::error::Result;
use std::sync::Arc;

/// Pluggable `(texts) → vectors` contract.
pub trait TextEncoder: Send + Sync {
    /// Encode a batch of texts into fixed-dimension vectors.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the produced vectors.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded in the manifest and embeddings.
    fn model_name(&self) -> &str;
}

impl<E: TextEncoder + ?Sized> TextEncoder for Arc<E> {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).encode(texts)
    }
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_adapter::FastEmbedEncoder;

#[cfg(feature = "embeddings")]
mod fastembed_adapter {
    use super::TextEncoder;
    use crate::error::{KddError, Result};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    /// FastEmbed-backed encoder.
    pub struct FastEmbedEncoder {
        model: TextEmbedding,
        model_name: String,
        dimensions: usize,
    }

    impl FastEmbedEncoder {
        /// Default model: BGE-small, 384 dimensions.
        pub fn new() -> Result<Self> {
            Self::with_model(EmbeddingModel::BGESmallENV15)
        }

        pub fn with_model(model: EmbeddingModel) -> Result<Self> {
            let embedding = TextEmbedding::try_new(InitOptions::new(model.clone()))
                .map_err(|e| KddError::Encoder(format!("failed to initialize fastembed: {e}")))?;

            let dimensions = match model {
                EmbeddingModel::BGESmallENV15 => 384,
                EmbeddingModel::BGEBaseENV15 => 768,
                EmbeddingModel::BGELargeENV15 => 1024,
                EmbeddingModel::AllMiniLML6V2 => 384,
                EmbeddingModel::AllMiniLML12V2 => 384,
                _ => 384,
            };

            Ok(Self {
                model: embedding,
                model_name: format!("{model:?}"),
                dimensions,
            })
        }
    }

    impl TextEncoder for FastEmbedEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            self.model
                .embed(texts.to_vec(), None)
                .map_err(|e| KddError::Encoder(format!("embedding failed: {e}")))
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        #[ignore] // Requires model download
        fn encodes_to_expected_dimensions() {
            let encoder = FastEmbedEncoder::new().unwrap();
            assert_eq!(encoder.dimensions(), 384);
            let vectors = encoder
                .encode(&["a test sentence".to_string()])
                .unwrap();
            assert_eq!(vectors.len(), 1);
            assert_eq!(vectors[0].len(), 384);
        }
    }
}

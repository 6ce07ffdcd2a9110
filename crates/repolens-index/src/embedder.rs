//! Batched text embedding on top of an [`LlmProvider`].

use std::sync::Arc;

use repolens_llm::LlmProvider;

use crate::error::{IndexError, Result};

/// Default number of texts sent per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Maps texts to fixed-dimension vectors, one per input, in input order.
pub struct Embedder<P: LlmProvider> {
    provider: Arc<P>,
    batch_size: usize,
}

impl<P: LlmProvider> Clone for Embedder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            batch_size: self.batch_size,
        }
    }
}

impl<P: LlmProvider> Embedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Embed every text. Batches are sent sequentially so the output order
    /// matches the input order.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Llm` on provider failure, `IndexError::EmbeddingCount`
    /// if a batch comes back short or long, and `IndexError::DimensionMismatch`
    /// if vectors disagree on dimension.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.provider.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(IndexError::EmbeddingCount {
                    expected: batch.len(),
                    actual: embedded.len(),
                });
            }
            vectors.extend(embedded);
        }

        let dimension = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        tracing::debug!(
            texts = texts.len(),
            dimension,
            provider = self.provider.name(),
            "embedded batch"
        );
        Ok(vectors)
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Llm` if the provider fails.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.provider.embed(text).await?)
    }
}

//! Embedding provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for providers that convert text to fixed-dimension vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    ///
    /// # Errors
    ///
    /// Returns a recoverable error when the provider is unreachable and a
    /// protocol error when its response cannot be interpreted.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// Default implementation embeds each text in turn; providers with a
    /// native batch endpoint should override it.
    ///
    /// # Errors
    ///
    /// Fails on the first text that cannot be embedded.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }

    /// The dimension every embedding from this provider has
    fn dimension(&self) -> usize;

    /// The model name/identifier
    fn model_name(&self) -> &str;

    /// Check if the provider is reachable and configured
    async fn is_available(&self) -> bool {
        self.embed_text("test").await.is_ok()
    }

    /// Warm up the provider (open connections, load models)
    ///
    /// # Errors
    ///
    /// Returns the underlying embedding error when the probe fails.
    async fn warmup(&self) -> Result<()> {
        self.embed_text("warmup").await?;
        Ok(())
    }
}

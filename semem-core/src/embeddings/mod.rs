//! Embedding generation and similarity search support
//!
//! The [`EmbeddingService`] wraps the provider selected at startup, retries
//! transient failures with exponential backoff, and enforces the configured
//! dimension on every vector it hands out.

pub mod http;
pub mod mock;
pub mod provider;
pub mod similarity;

use std::sync::Arc;

use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};

pub use http::HttpEmbeddingProvider;
pub use mock::MockEmbeddingProvider;
pub use provider::EmbeddingProvider;
pub use similarity::{cosine_similarity, cosine_similarity_01};

/// Embedding facade bound to the provider chosen at startup
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    retry: RetryPolicy,
}

impl EmbeddingService {
    /// Bind the service to a provider, verifying its dimension against the
    /// configured one.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on dimension mismatch; this is fatal at
    /// startup.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Result<Self> {
        if provider.dimension() != dimension {
            return Err(Error::Config(format!(
                "embedding provider {} produces {}-dimension vectors, configured dimension is {}",
                provider.model_name(),
                provider.dimension(),
                dimension
            )));
        }

        let retry = RetryPolicy::with_config(
            RetryConfig::new()
                .with_max_retries(defaults::EMBEDDING_RETRY_ATTEMPTS)
                .with_base_delay(defaults::EMBEDDING_RETRY_BASE_DELAY),
        );

        Ok(Self {
            provider,
            dimension,
            retry,
        })
    }

    /// Embed one text, retrying transient provider failures.
    ///
    /// # Errors
    ///
    /// Returns `Error::Data` when the provider hands back a vector of the
    /// wrong dimension, or the provider error once retries are exhausted.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .retry
            .execute(|| self.provider.embed_text(text))
            .await?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Embed a batch of texts in provider order.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`EmbeddingService::embed`].
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self
            .retry
            .execute(|| self.provider.embed_batch(texts))
            .await?;
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }
        Ok(embeddings)
    }

    /// Cosine similarity in [-1, 1]
    #[must_use]
    pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
        similarity::cosine_similarity(a, b)
    }

    /// The configured embedding dimension
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The active provider's model name
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() == self.dimension {
            Ok(())
        } else {
            Err(Error::Data(format!(
                "embedding dimension mismatch: got {}, expected {}",
                embedding.len(),
                self.dimension
            )))
        }
    }
}

//! Deterministic in-process embedding provider
//!
//! Hashes the input into a pseudo-random unit vector. Identical inputs
//! always produce identical vectors within and across processes, which is
//! what similarity and cache tests need; it carries no semantic signal.

use async_trait::async_trait;

use super::provider::EmbeddingProvider;
use super::similarity::normalize_vector;
use crate::error::Result;

/// Hash-based embedding provider for tests and the `memory` storage profile
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn fnv1a(text: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        // xorshift64* seeded from the text hash
        let mut state = Self::fnv1a(text) | 1;
        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            let sample = state.wrapping_mul(0x2545_f491_4f6c_dd1d);
            vector.push(((sample >> 11) as f32 / (1u64 << 53) as f32).mul_add(2.0, -1.0));
        }
        Ok(normalize_vector(vector))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_inputs_produce_identical_vectors() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed_text("hello world").await.unwrap();
        let b = provider.embed_text("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_different_inputs_differ() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed_text("alpha").await.unwrap();
        let b = provider.embed_text("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_vectors_are_unit_length() {
        let provider = MockEmbeddingProvider::new(32);
        let v = provider.embed_text("norm").await.unwrap();
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.001);
    }
}

//! HTTP embedding provider
//!
//! Speaks the `/embeddings` request shape shared by OpenAI-compatible
//! services (OpenAI, Mistral, Ollama's OpenAI facade). Authentication is a
//! bearer token when an API key is configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::provider::EmbeddingProvider;
use crate::constants::defaults;
use crate::error::{Error, Result};

/// Embedding provider backed by an HTTP embeddings endpoint
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    /// Create a provider for an OpenAI-shaped embeddings endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the HTTP client cannot be constructed.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(defaults::LLM_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimension,
        })
    }

    async fn request_embeddings(&self, input: EmbeddingInput) -> Result<EmbeddingResponse> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            input,
            model: self.model.clone(),
            encoding_format: Some("float".to_string()),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("embeddings endpoint {status}: {body}")));
        }

        response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Protocol(format!("malformed embeddings response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let started = Instant::now();
        let response = self
            .request_embeddings(EmbeddingInput::Single(text.to_string()))
            .await?;

        let first = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Protocol("embeddings endpoint returned no data".to_string()))?;

        tracing::debug!(
            "embedded {} chars in {}ms ({} dimensions)",
            text.len(),
            started.elapsed().as_millis(),
            first.embedding.len()
        );
        Ok(first.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .request_embeddings(EmbeddingInput::Batch(texts.to_vec()))
            .await?;

        if response.data.len() != texts.len() {
            return Err(Error::Protocol(format!(
                "embeddings endpoint returned {} vectors for {} texts",
                response.data.len(),
                texts.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: EmbeddingInput,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_construction_trims_trailing_slash() {
        let provider = HttpEmbeddingProvider::new(
            "http://localhost:11434/v1/".to_string(),
            None,
            "nomic-embed-text".to_string(),
            768,
        )
        .unwrap();

        assert_eq!(provider.base_url, "http://localhost:11434/v1");
        assert_eq!(provider.dimension(), 768);
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_response_parsing_orders_by_index() {
        let raw = r#"{"data":[
            {"embedding":[0.3],"index":1},
            {"embedding":[0.1],"index":0}
        ]}"#;
        let mut response: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        response.data.sort_by_key(|d| d.index);
        assert_eq!(response.data[0].embedding, vec![0.1]);
        assert_eq!(response.data[1].embedding, vec![0.3]);
    }
}

//! Chat completion providers
//!
//! One HTTP implementation covers every OpenAI-compatible chat API in the
//! registry (OpenAI, Mistral, Ollama's compatibility endpoint); a scripted
//! mock serves tests and offline profiles.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::constants::defaults;
use crate::error::{Error, Result};

/// Trait for chat-completion providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate a completion for `prompt`, optionally preceded by context.
    ///
    /// # Errors
    ///
    /// Returns a recoverable error when the provider is unreachable and a
    /// protocol error when its response cannot be interpreted.
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String>;

    /// The model name/identifier
    fn model_name(&self) -> &str;

    /// Check if the provider is reachable and configured
    async fn is_available(&self) -> bool {
        self.generate("ping", None).await.is_ok()
    }
}

/// Chat provider backed by an OpenAI-shaped `/chat/completions` endpoint
pub struct HttpChatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpChatProvider {
    /// Create a provider with the default 60 s request deadline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the HTTP client cannot be constructed.
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Result<Self> {
        Self::with_timeout(base_url, api_key, model, defaults::LLM_TIMEOUT)
    }

    /// Create a provider with an explicit request deadline.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the HTTP client cannot be constructed.
    pub fn with_timeout(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(context) = context {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: context.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("chat endpoint {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Protocol(format!("malformed chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Protocol("chat endpoint returned no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted chat provider for tests and offline use.
///
/// Replies are consumed in order; once the script is exhausted the default
/// reply is returned indefinitely.
pub struct MockChatProvider {
    replies: Mutex<VecDeque<String>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl MockChatProvider {
    #[must_use]
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a scripted reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(reply.into());
    }

    /// Prompts observed so far, in call order
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn generate(&self, prompt: &str, _context: Option<&str>) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone()))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_then_default() {
        let provider = MockChatProvider::new("fallback");
        provider.push_reply("first");
        provider.push_reply("second");

        assert_eq!(provider.generate("a", None).await.unwrap(), "first");
        assert_eq!(provider.generate("b", None).await.unwrap(), "second");
        assert_eq!(provider.generate("c", None).await.unwrap(), "fallback");
        assert_eq!(provider.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_chat_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hi");
    }
}

//! Provider registry
//!
//! Holds the configured LLM/embedding providers, tagged by capability and
//! ordered by priority. Selection returns the best available candidate;
//! repeated failures push selection to the next one.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::constants::defaults;
use crate::embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
use crate::error::{Error, Result};
use crate::llm::{ChatProvider, HttpChatProvider, MockChatProvider};

/// Capability a provider can be selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Embedding,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Embedding => "embedding",
        }
    }
}

struct RegistryEntry {
    config: ProviderConfig,
    failures: AtomicU32,
}

/// Priority-ordered, capability-tagged provider registry
pub struct ProviderRegistry {
    entries: Vec<RegistryEntry>,
    failure_threshold: u32,
}

impl ProviderRegistry {
    /// Build the registry from configuration, sorted by ascending priority.
    #[must_use]
    pub fn from_config(providers: &[ProviderConfig]) -> Self {
        let mut configs: Vec<ProviderConfig> = providers.to_vec();
        configs.sort_by_key(|p| p.priority);

        Self {
            entries: configs
                .into_iter()
                .map(|config| RegistryEntry {
                    config,
                    failures: AtomicU32::new(0),
                })
                .collect(),
            failure_threshold: defaults::PROVIDER_FAILURE_THRESHOLD,
        }
    }

    /// Select the lowest-priority provider declaring `capability` that has
    /// not exceeded the failure threshold.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` when no candidate remains.
    pub fn pick(&self, capability: Capability) -> Result<&ProviderConfig> {
        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .config
                    .capabilities
                    .iter()
                    .any(|c| c == capability.as_str())
            })
            .find(|entry| entry.failures.load(Ordering::SeqCst) < self.failure_threshold)
            .map(|entry| &entry.config)
            .ok_or_else(|| {
                Error::Provider(format!(
                    "no available provider for capability {:?}",
                    capability.as_str()
                ))
            })
    }

    /// Record a failure against the named provider kind; after the threshold
    /// is reached selection falls through to the next candidate.
    pub fn mark_failure(&self, kind: &str) {
        if let Some(entry) = self.entries.iter().find(|e| e.config.kind == kind) {
            let failures = entry.failures.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!("provider {} failure {} recorded", kind, failures);
        }
    }

    /// Reset the failure counter for the named provider kind.
    pub fn mark_success(&self, kind: &str) {
        if let Some(entry) = self.entries.iter().find(|e| e.config.kind == kind) {
            entry.failures.store(0, Ordering::SeqCst);
        }
    }

    /// Find an available provider of a specific kind declaring `capability`.
    #[must_use]
    pub fn find_available(&self, kind: &str, capability: Capability) -> Option<&ProviderConfig> {
        self.entries
            .iter()
            .filter(|entry| entry.config.kind == kind)
            .filter(|entry| {
                entry
                    .config
                    .capabilities
                    .iter()
                    .any(|c| c == capability.as_str())
            })
            .find(|entry| entry.failures.load(Ordering::SeqCst) < self.failure_threshold)
            .map(|entry| &entry.config)
    }

    /// Instantiate the chat provider: the preferred kind when it is
    /// available, the best candidate by priority otherwise.
    ///
    /// # Errors
    ///
    /// Fails when no chat-capable provider is available or the provider
    /// cannot be constructed.
    pub fn build_chat(
        &self,
        preferred_kind: Option<&str>,
        fallback_model: Option<&str>,
    ) -> Result<Arc<dyn ChatProvider>> {
        let preferred = preferred_kind
            .filter(|kind| !kind.is_empty())
            .and_then(|kind| self.find_available(kind, Capability::Chat));
        let config = match preferred {
            Some(config) => config,
            None => self.pick(Capability::Chat)?,
        };

        if config.kind == "mock" {
            return Ok(Arc::new(MockChatProvider::new(String::new())));
        }

        let model = config
            .chat_model
            .clone()
            .or_else(|| fallback_model.filter(|m| !m.is_empty()).map(String::from))
            .ok_or_else(|| {
                Error::Config(format!("provider {} has no chat model", config.kind))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&config.kind).to_string());
        Ok(Arc::new(HttpChatProvider::new(
            base_url,
            config.api_key.clone(),
            model,
        )?))
    }

    /// Instantiate the embedding provider for the current best embedding
    /// candidate.
    ///
    /// # Errors
    ///
    /// Fails when no embedding-capable provider is available or the provider
    /// cannot be constructed.
    pub fn build_embedding(
        &self,
        preferred_kind: Option<&str>,
        fallback_model: Option<&str>,
        dimension: usize,
    ) -> Result<Arc<dyn EmbeddingProvider>> {
        let preferred = preferred_kind
            .filter(|kind| !kind.is_empty())
            .and_then(|kind| self.find_available(kind, Capability::Embedding));
        let config = match preferred {
            Some(config) => config,
            None => self.pick(Capability::Embedding)?,
        };

        if config.kind == "mock" {
            return Ok(Arc::new(MockEmbeddingProvider::new(dimension)));
        }

        let model = config
            .embedding_model
            .clone()
            .or_else(|| fallback_model.filter(|m| !m.is_empty()).map(String::from))
            .ok_or_else(|| {
                Error::Config(format!("provider {} has no embedding model", config.kind))
            })?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&config.kind).to_string());
        Ok(Arc::new(HttpEmbeddingProvider::new(
            base_url,
            config.api_key.clone(),
            model,
            dimension,
        )?))
    }
}

fn default_base_url(kind: &str) -> &'static str {
    match kind {
        "mistral" => "https://api.mistral.ai/v1",
        "ollama" => "http://localhost:11434/v1",
        _ => "https://api.openai.com/v1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(kind: &str, capabilities: &[&str], priority: u32) -> ProviderConfig {
        ProviderConfig {
            kind: kind.to_string(),
            capabilities: capabilities.iter().map(ToString::to_string).collect(),
            priority,
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_pick_prefers_lowest_priority() {
        let registry = ProviderRegistry::from_config(&[
            provider("ollama", &["chat", "embedding"], 2),
            provider("mistral", &["chat"], 1),
        ]);

        assert_eq!(registry.pick(Capability::Chat).unwrap().kind, "mistral");
        assert_eq!(registry.pick(Capability::Embedding).unwrap().kind, "ollama");
    }

    #[test]
    fn test_repeated_failure_falls_back_to_next() {
        let registry = ProviderRegistry::from_config(&[
            provider("mistral", &["chat"], 1),
            provider("ollama", &["chat"], 2),
        ]);

        for _ in 0..defaults::PROVIDER_FAILURE_THRESHOLD {
            registry.mark_failure("mistral");
        }
        assert_eq!(registry.pick(Capability::Chat).unwrap().kind, "ollama");

        registry.mark_success("mistral");
        assert_eq!(registry.pick(Capability::Chat).unwrap().kind, "mistral");
    }

    #[test]
    fn test_no_candidate_is_an_error() {
        let registry = ProviderRegistry::from_config(&[provider("mistral", &["chat"], 1)]);
        assert!(registry.pick(Capability::Embedding).is_err());
    }

    #[test]
    fn test_mock_providers_build_without_network_config() {
        let registry = ProviderRegistry::from_config(&[provider(
            "mock",
            &["chat", "embedding"],
            1,
        )]);

        assert!(registry.build_chat(None, Some("any")).is_ok());
        assert!(registry.build_embedding(None, None, 64).is_ok());
    }

    #[test]
    fn test_preferred_kind_overrides_priority() {
        let registry = ProviderRegistry::from_config(&[
            provider("mistral", &["chat"], 1),
            provider("ollama", &["chat", "embedding"], 2),
        ]);

        assert_eq!(
            registry
                .find_available("ollama", Capability::Chat)
                .unwrap()
                .kind,
            "ollama"
        );
        // a preferred kind without the capability falls back to priority
        assert!(registry
            .find_available("mistral", Capability::Embedding)
            .is_none());
    }
}

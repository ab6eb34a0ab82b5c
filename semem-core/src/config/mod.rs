//! Typed configuration schema and loading
//!
//! Config files are TOML. Loading is a single pass: parse, substitute
//! `${VAR}` templates over string leaves, apply `SEMEM_*` overrides by
//! dotted path, deserialize into the typed schema, then validate. All
//! validation errors are collected and reported together.

pub mod env;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::constants::{defaults, vocab};
use crate::error::{Error, Result};

/// Environment variable prefix for dotted-path overrides
pub const ENV_PREFIX: &str = "SEMEM_";

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageType {
    Memory,
    Json,
    Sparql,
    CachedSparql,
}

impl Default for StorageType {
    fn default() -> Self {
        Self::Memory
    }
}

/// Backend-specific storage options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// File path for the JSON backend
    pub path: Option<String>,
    /// SPARQL query endpoint URL
    pub query: Option<String>,
    /// SPARQL update endpoint URL
    pub update: Option<String>,
    /// Named graph for persisted interactions
    pub graph_name: Option<String>,
    /// HTTP Basic auth user
    pub user: Option<String>,
    /// HTTP Basic auth password
    pub password: Option<String>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: StorageType,
    pub options: StorageOptions,
}

/// Active model selection for one capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    /// Provider kind this capability should use (matches `llm_providers[].type`)
    pub provider: String,
    /// Model identifier passed to the provider
    pub model: String,
    /// Provider-specific options, passed through untyped
    pub options: HashMap<String, String>,
}

/// Chat and embedding model selections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub chat: ModelSelection,
    pub embedding: ModelSelection,
}

/// One entry of the provider registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind: "openai", "mistral", "ollama", or "mock"
    #[serde(rename = "type")]
    pub kind: String,
    /// Declared capabilities: "chat" and/or "embedding"
    pub capabilities: Vec<String>,
    /// Selection priority; lower is preferred
    pub priority: u32,
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
    /// Credential, literal or `${VAR}` template
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            capabilities: Vec::new(),
            priority: 100,
            chat_model: None,
            embedding_model: None,
            api_key: None,
            base_url: None,
        }
    }
}

/// Tunable memory-store parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Embedding dimension the active provider must produce
    pub dimension: usize,
    /// Minimum composite score for a retrieval hit (0.0 to 1.0)
    pub similarity_threshold: f32,
    /// Number of interactions fed back as conversational context
    pub context_window: usize,
    /// Per-second decay applied to access counts
    pub decay_rate: f32,
    /// Accumulated relevance required for short-to-long promotion.
    ///
    /// Revisions of this system disagreed on whether the threshold is fixed;
    /// it is exposed here with the historical default of 2.0.
    pub promotion_threshold: f32,
    /// Minimum access count required for promotion
    pub promotion_min_access: f32,
    /// Probability of running concept classification on ingest (0.0 to 1.0)
    pub classification_chance: f32,
    /// Bounded working-set size of the short-term tier
    pub short_term_capacity: usize,
    /// Composite score weight on embedding similarity
    pub similarity_weight: f32,
    /// Composite score weight on concept overlap
    pub concept_weight: f32,
    /// Composite score weight on recency
    pub recency_weight: f32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            dimension: defaults::EMBEDDING_DIMENSION,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            context_window: defaults::CONTEXT_WINDOW,
            decay_rate: defaults::DECAY_RATE,
            promotion_threshold: defaults::PROMOTION_THRESHOLD,
            promotion_min_access: defaults::PROMOTION_MIN_ACCESS,
            classification_chance: 1.0,
            short_term_capacity: defaults::SHORT_TERM_CAPACITY,
            similarity_weight: defaults::SCORE_WEIGHT_SIMILARITY,
            concept_weight: defaults::SCORE_WEIGHT_CONCEPTS,
            recency_weight: defaults::SCORE_WEIGHT_RECENCY,
        }
    }
}

/// Coordinates of one SPARQL service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SparqlEndpointConfig {
    pub label: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub url_base: Option<String>,
    pub dataset: Option<String>,
    pub query: Option<String>,
    pub update: Option<String>,
    pub upload: Option<String>,
    pub gsp_read: Option<String>,
    pub gsp_write: Option<String>,
}

/// Named graphs the engine reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Content and corpus nodes
    pub content: String,
    /// Navigation provenance
    pub navigation: String,
    /// Serialized session blobs
    pub session: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            content: vocab::CONTENT_GRAPH.to_string(),
            navigation: vocab::NAVIGATION_GRAPH.to_string(),
            session: vocab::SESSION_GRAPH.to_string(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub models: ModelsConfig,
    pub llm_providers: Vec<ProviderConfig>,
    pub memory: MemorySettings,
    pub sparql_endpoints: Vec<SparqlEndpointConfig>,
    pub graphs: GraphConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Parse, resolve, and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on parse failure or when validation finds
    /// problems; all validation errors are reported in one message.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut value: toml::Value = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid config TOML: {e}")))?;

        env::substitute_value(&mut value);
        env::apply_overrides(&mut value, ENV_PREFIX);

        let config: Config = value
            .try_into()
            .map_err(|e| Error::Config(format!("config does not match schema: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` listing all failures separated by `"; "`.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.memory.dimension == 0 {
            problems.push("memory.dimension must be greater than zero".to_string());
        }
        for (name, v) in [
            ("memory.similarity_threshold", self.memory.similarity_threshold),
            ("memory.classification_chance", self.memory.classification_chance),
        ] {
            if !(0.0..=1.0).contains(&v) {
                problems.push(format!("{name} must be within [0, 1], got {v}"));
            }
        }
        let weight_sum = self.memory.similarity_weight
            + self.memory.concept_weight
            + self.memory.recency_weight;
        if (weight_sum - 1.0).abs() > 0.001 {
            problems.push(format!(
                "memory score weights must sum to 1.0, got {weight_sum}"
            ));
        }

        if matches!(
            self.storage.kind,
            StorageType::Sparql | StorageType::CachedSparql
        ) {
            let has_inline = self.storage.options.query.is_some();
            let has_endpoint = self
                .sparql_endpoints
                .iter()
                .any(|e| e.query.is_some() || e.url_base.is_some());
            if !has_inline && !has_endpoint {
                problems.push(
                    "sparql storage requires storage.options.query or a sparql_endpoints entry"
                        .to_string(),
                );
            }
        }
        if self.storage.kind == StorageType::Json && self.storage.options.path.is_none() {
            problems.push("json storage requires storage.options.path".to_string());
        }

        for (i, provider) in self.llm_providers.iter().enumerate() {
            if provider.kind.is_empty() {
                problems.push(format!("llm_providers[{i}] is missing its type"));
            }
            if provider.capabilities.is_empty() {
                problems.push(format!(
                    "llm_providers[{i}] ({}) declares no capabilities",
                    provider.kind
                ));
            }
            for capability in &provider.capabilities {
                if capability != "chat" && capability != "embedding" {
                    problems.push(format!(
                        "llm_providers[{i}] ({}) has unknown capability {capability:?}",
                        provider.kind
                    ));
                }
            }
            if let Some(base_url) = &provider.base_url {
                if url::Url::parse(base_url).is_err() {
                    problems.push(format!(
                        "llm_providers[{i}] ({}) base_url is not a valid URL: {base_url}",
                        provider.kind
                    ));
                }
            }
        }

        for (i, endpoint) in self.sparql_endpoints.iter().enumerate() {
            for (field, value) in [
                ("url_base", &endpoint.url_base),
                ("query", &endpoint.query),
                ("update", &endpoint.update),
            ] {
                if let Some(value) = value {
                    if url::Url::parse(value).is_err() {
                        problems.push(format!(
                            "sparql_endpoints[{i}].{field} is not a valid URL: {value}"
                        ));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }

    /// Resolve the query/update endpoint pair for SPARQL-backed storage.
    ///
    /// Inline `storage.options` win; otherwise the first `sparql_endpoints`
    /// entry is used, deriving URLs from `url_base`/`dataset` when the
    /// explicit fields are absent.
    #[must_use]
    pub fn resolved_sparql_endpoints(&self) -> Option<(String, String)> {
        if let Some(query) = &self.storage.options.query {
            let update = self
                .storage
                .options
                .update
                .clone()
                .unwrap_or_else(|| query.clone());
            return Some((query.clone(), update));
        }

        let endpoint = self.sparql_endpoints.first()?;
        if let Some(query) = &endpoint.query {
            let update = endpoint.update.clone().unwrap_or_else(|| query.clone());
            return Some((query.clone(), update));
        }
        let base = endpoint.url_base.as_ref()?;
        let dataset = endpoint.dataset.clone().unwrap_or_else(|| "ds".to_string());
        Some((
            format!("{base}/{dataset}/query"),
            format!("{base}/{dataset}/update"),
        ))
    }
}

//! Engine facade
//!
//! The transport-agnostic surface of the engine: `tell`, `ask`, `augment`,
//! `navigate`, and `iterate`. Every operation returns a result object with
//! a `success` flag and never propagates an error across the boundary; on
//! failure the answer-bearing field falls back to the best prior artifact.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::concepts::{concept_uri, ConceptExtractor};
use crate::config::{Config, StorageType};
use crate::constants::vocab;
use crate::embeddings::{EmbeddingProvider, EmbeddingService};
use crate::error::{Error, Result};
use crate::iterate::{
    IterationController, IterationInput, IterationOptions, IterationResult, ResearchProvider,
};
use crate::llm::ChatProvider;
use crate::memory::{MemoryStore, ScoredInteraction};
use crate::providers::ProviderRegistry;
use crate::sparql::builder::{insert_data, typed_literal, uri_ref, TripleBlock};
use crate::sparql::{HttpSparqlClient, SparqlEndpoint};
use crate::storage::{
    CachedSparqlBackend, JsonBackend, MemoryBackend, SparqlBackend, StorageBackend,
};
use crate::zpt::{
    Corpuscle, NavigationOutcome, NavigationParams, SessionStore, ZptNavigator,
};

/// Content kind accepted by `tell`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TellType {
    Document,
    Interaction,
    Concept,
    Fact,
}

/// Result object for `tell`
#[derive(Debug, Clone, Serialize)]
pub struct TellOutcome {
    pub success: bool,
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result object for `ask`
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub success: bool,
    pub answer: String,
    pub results: Vec<ScoredInteraction>,
    pub corpuscles: Vec<Corpuscle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result object for `augment`
#[derive(Debug, Clone, Serialize)]
pub struct AugmentOutcome {
    pub success: bool,
    pub augmentation_type: String,
    pub total_concepts: usize,
    pub total_embeddings: usize,
    pub concepts_embedded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result object for `navigate`
#[derive(Debug, Clone, Serialize)]
pub struct NavigateOutcome {
    pub success: bool,
    pub results: Vec<Corpuscle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<crate::zpt::NavigationMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result object for `iterate`
#[derive(Debug, Clone, Serialize)]
pub struct IterateOutcome {
    pub success: bool,
    #[serde(flatten)]
    pub result: IterationResult,
}

/// The assembled navigation and memory retrieval engine
pub struct SememEngine {
    config: Config,
    embeddings: EmbeddingService,
    chat: Arc<dyn ChatProvider>,
    extractor: ConceptExtractor,
    memory: Arc<MemoryStore>,
    navigator: Option<ZptNavigator>,
    controller: IterationController,
    research: Option<Arc<dyn ResearchProvider>>,
    endpoint: Option<Arc<dyn SparqlEndpoint>>,
}

impl SememEngine {
    /// Assemble the engine from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the configuration and collaborators do
    /// not line up (wrong embedding dimension, SPARQL storage without an
    /// endpoint, JSON storage without a path).
    pub fn with_components(
        config: Config,
        chat: Arc<dyn ChatProvider>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        endpoint: Option<Arc<dyn SparqlEndpoint>>,
        research: Option<Arc<dyn ResearchProvider>>,
    ) -> Result<Self> {
        let embeddings = EmbeddingService::new(embedding_provider, config.memory.dimension)?;
        let query_cache = Arc::new(QueryCache::new());

        let storage_graph = config
            .storage
            .options
            .graph_name
            .clone()
            .unwrap_or_else(|| config.graphs.content.clone());
        let backend: Arc<dyn StorageBackend> = match config.storage.kind {
            StorageType::Memory => Arc::new(MemoryBackend::new()),
            StorageType::Json => {
                let path = config.storage.options.path.clone().ok_or_else(|| {
                    Error::Config("json storage requires storage.options.path".to_string())
                })?;
                Arc::new(JsonBackend::new(path.into()))
            }
            StorageType::Sparql => Arc::new(SparqlBackend::new(
                require_endpoint(&endpoint)?,
                storage_graph,
            )),
            StorageType::CachedSparql => Arc::new(CachedSparqlBackend::new(
                require_endpoint(&endpoint)?,
                storage_graph,
            )),
        };

        let memory = Arc::new(MemoryStore::new(
            config.memory.clone(),
            backend,
            Arc::clone(&query_cache),
        ));

        let navigator = endpoint.as_ref().map(|endpoint| {
            ZptNavigator::new(
                Arc::clone(endpoint),
                Arc::clone(&query_cache),
                SessionStore::new(Some(Arc::clone(endpoint)), config.graphs.session.clone()),
                config.graphs.content.clone(),
                config.graphs.navigation.clone(),
            )
        });

        let controller = IterationController::new(
            Arc::clone(&chat),
            research.clone(),
            endpoint.clone(),
            config.graphs.content.clone(),
            IterationOptions::default(),
        );

        Ok(Self {
            extractor: ConceptExtractor::new(Arc::clone(&chat)),
            config,
            embeddings,
            chat,
            memory,
            navigator,
            controller,
            research,
            endpoint,
        })
    }

    /// Assemble the engine from configuration alone, building providers
    /// through the registry and the SPARQL client from the endpoint config.
    ///
    /// # Errors
    ///
    /// Fatal configuration problems (no usable provider, missing endpoint
    /// for SPARQL storage) surface as `Error::Config`/`Error::Provider`.
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.llm_providers);
        let chat = registry.build_chat(
            Some(&config.models.chat.provider),
            Some(&config.models.chat.model),
        )?;
        let embedding_provider = registry.build_embedding(
            Some(&config.models.embedding.provider),
            Some(&config.models.embedding.model),
            config.memory.dimension,
        )?;

        let endpoint: Option<Arc<dyn SparqlEndpoint>> = match config.resolved_sparql_endpoints() {
            Some((query, update)) => {
                let first = config.sparql_endpoints.first();
                let user = config
                    .storage
                    .options
                    .user
                    .clone()
                    .or_else(|| first.and_then(|e| e.user.clone()));
                let password = config
                    .storage
                    .options
                    .password
                    .clone()
                    .or_else(|| first.and_then(|e| e.password.clone()));
                Some(Arc::new(HttpSparqlClient::new(query, update, user, password)?))
            }
            None => None,
        };

        Self::with_components(config, chat, embedding_provider, endpoint, None)
    }

    /// Ingest content into memory and the knowledge graph.
    pub async fn tell(
        &self,
        content: &str,
        kind: TellType,
        metadata: &HashMap<String, String>,
    ) -> TellOutcome {
        let embedding = match self.embeddings.embed(content).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!("embedding unavailable at ingest, marking pending: {}", e);
                None
            }
        };

        // concept classification is sampled; chance 1.0 classifies everything
        let concepts = if rand::random::<f32>() <= self.config.memory.classification_chance {
            self.extractor.extract(content).await
        } else {
            Vec::new()
        };

        let response = metadata.get("response").cloned().unwrap_or_default();
        let source = metadata.get("source").cloned();
        let interaction = self.memory.add_interaction(
            content.to_string(),
            response,
            embedding,
            concepts.clone(),
            source,
        );

        let mut ids = vec![interaction.uri()];
        match self.mirror_content(content, kind, &concepts).await {
            Ok(mut graph_ids) => ids.append(&mut graph_ids),
            Err(e) => {
                tracing::warn!("content graph mirror failed: {}", e);
                return TellOutcome {
                    success: false,
                    ids,
                    error: Some(e.to_string()),
                };
            }
        }

        TellOutcome {
            success: true,
            ids,
            error: None,
        }
    }

    /// Answer a question from navigation results and memory.
    pub async fn ask(&self, question: &str, zpt: Option<NavigationParams>) -> AskOutcome {
        let query_embedding = match self.embeddings.embed(question).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("query embedding failed, memory ranking degraded: {}", e);
                Vec::new()
            }
        };
        let query_concepts = self.extractor.extract(question).await;

        let corpuscles = match &self.navigator {
            Some(navigator) => {
                let params = zpt.unwrap_or_else(|| NavigationParams {
                    query: question.to_string(),
                    ..NavigationParams::default()
                });
                match navigator.navigate(&params, None).await {
                    Ok(outcome) => outcome.corpuscles,
                    Err(e) => {
                        tracing::warn!("navigation during ask failed: {}", e);
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        let results = self.memory.retrieve_relevant(
            &query_embedding,
            &query_concepts,
            self.config.memory.context_window,
            None,
        );

        let context = build_answer_context(&results, &corpuscles);
        match self.chat.generate(question, Some(&context)).await {
            Ok(answer) => AskOutcome {
                success: true,
                answer,
                results,
                corpuscles,
                error: None,
            },
            Err(e) => {
                // fall back to the best remembered response
                let answer = results
                    .first()
                    .map(|hit| hit.interaction.response.clone())
                    .unwrap_or_default();
                AskOutcome {
                    success: false,
                    answer,
                    results,
                    corpuscles,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run a concept augmentation over `target` text.
    pub async fn augment(
        &self,
        target: &str,
        operation: &str,
        _options: &HashMap<String, String>,
    ) -> AugmentOutcome {
        match operation {
            "concepts" => {
                let concepts = self.extractor.extract(target).await;
                AugmentOutcome {
                    success: true,
                    augmentation_type: operation.to_string(),
                    total_concepts: concepts.len(),
                    total_embeddings: 0,
                    concepts_embedded: Vec::new(),
                    error: None,
                }
            }
            "concept_embeddings" => {
                let concepts = self.extractor.extract(target).await;
                match self.embeddings.embed_batch(&concepts).await {
                    Ok(vectors) => {
                        if let Err(e) = self.mirror_concept_embeddings(&concepts, &vectors).await {
                            tracing::warn!("concept embedding mirror failed: {}", e);
                        }
                        AugmentOutcome {
                            success: true,
                            augmentation_type: operation.to_string(),
                            total_concepts: concepts.len(),
                            total_embeddings: vectors.len(),
                            concepts_embedded: concepts,
                            error: None,
                        }
                    }
                    Err(e) => AugmentOutcome {
                        success: false,
                        augmentation_type: operation.to_string(),
                        total_concepts: concepts.len(),
                        total_embeddings: 0,
                        concepts_embedded: Vec::new(),
                        error: Some(e.to_string()),
                    },
                }
            }
            other => AugmentOutcome {
                success: false,
                augmentation_type: other.to_string(),
                total_concepts: 0,
                total_embeddings: 0,
                concepts_embedded: Vec::new(),
                error: Some(
                    Error::Domain(format!("unsupported augment operation {other:?}")).to_string(),
                ),
            },
        }
    }

    /// Execute one navigation request.
    pub async fn navigate(
        &self,
        params: &NavigationParams,
        session_id: Option<String>,
    ) -> NavigateOutcome {
        let Some(navigator) = &self.navigator else {
            return NavigateOutcome {
                success: false,
                results: Vec::new(),
                metadata: None,
                error: Some("no SPARQL endpoint configured for navigation".to_string()),
            };
        };

        match navigator.navigate(params, session_id).await {
            Ok(NavigationOutcome {
                corpuscles,
                metadata,
            }) => NavigateOutcome {
                success: true,
                results: corpuscles,
                metadata: Some(metadata),
                error: None,
            },
            Err(e) => NavigateOutcome {
                success: false,
                results: Vec::new(),
                metadata: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Run the iterative refinement loop.
    pub async fn iterate(
        &self,
        input: IterationInput,
        options: Option<IterationOptions>,
    ) -> IterateOutcome {
        let result = match options {
            Some(options) => {
                let controller = IterationController::new(
                    Arc::clone(&self.chat),
                    self.research.clone(),
                    self.endpoint.clone(),
                    self.config.graphs.content.clone(),
                    options,
                );
                controller.process(input).await
            }
            None => self.controller.process(input).await,
        };

        IterateOutcome {
            success: true,
            result,
        }
    }

    /// The navigator, when a SPARQL endpoint is configured
    #[must_use]
    pub fn navigator(&self) -> Option<&ZptNavigator> {
        self.navigator.as_ref()
    }

    /// The two-tier memory store
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Spawn the periodic maintenance timers: access-count decay and the
    /// idle-session sweeper. Abort the returned handles on shutdown.
    #[must_use]
    pub fn start_maintenance(
        &self,
        decay_interval: std::time::Duration,
        sweep_interval: std::time::Duration,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = vec![MemoryStore::spawn_decay(
            Arc::clone(&self.memory),
            decay_interval,
        )];
        if let Some(navigator) = &self.navigator {
            tasks.push(crate::zpt::SessionStore::spawn_sweeper(
                navigator.sessions_handle(),
                sweep_interval,
            ));
        }
        tasks
    }

    /// Resolve pending writes before exit
    pub async fn shutdown(&self, drain: bool) {
        self.memory.shutdown(drain).await;
    }

    /// Mirror told content into the content graph so navigation can reach
    /// it: a typed node plus concept links.
    async fn mirror_content(
        &self,
        content: &str,
        kind: TellType,
        concepts: &[String],
    ) -> Result<Vec<String>> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(Vec::new());
        };

        let node_type = match kind {
            TellType::Document => "ragno:Unit",
            TellType::Interaction => "ragno:Unit",
            TellType::Concept => "skos:Concept",
            TellType::Fact => "ragno:Attribute",
        };
        let node_uri = format!("{}/unit/{}", vocab::URI_BASE, Uuid::new_v4());

        let mut block = TripleBlock::new();
        block
            .push(&node_uri, "rdf:type", node_type)
            .push_literal(&node_uri, "ragno:content", content)
            .push(
                &node_uri,
                "dcterms:created",
                &typed_literal(&Utc::now().to_rfc3339(), "dateTime"),
            );

        let mut ids = vec![node_uri.clone()];
        for concept in concepts {
            let uri = concept_uri(concept);
            block
                .push(&node_uri, "ragno:connectsTo", &uri_ref(&uri))
                .push(&uri, "rdf:type", "skos:Concept")
                .push_literal(&uri, "skos:prefLabel", concept);
            ids.push(uri);
        }

        endpoint
            .update(&insert_data(&self.config.graphs.content, &block.render()))
            .await?;
        Ok(ids)
    }

    /// Write concept embeddings into the content graph.
    async fn mirror_concept_embeddings(
        &self,
        concepts: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let mut block = TripleBlock::new();
        for (concept, vector) in concepts.iter().zip(vectors.iter()) {
            let uri = concept_uri(concept);
            let embedding_uri = format!("{uri}/embedding");
            let joined = vector
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            block
                .push(&uri, "ragno:hasEmbedding", &uri_ref(&embedding_uri))
                .push_literal(&embedding_uri, "ragno:vectorContent", &joined)
                .push_literal(
                    &embedding_uri,
                    "ragno:embeddingModel",
                    self.embeddings.model_name(),
                )
                .push(
                    &embedding_uri,
                    "ragno:dimension",
                    &typed_literal(&self.embeddings.dimension().to_string(), "integer"),
                );
        }

        endpoint
            .update(&insert_data(&self.config.graphs.content, &block.render()))
            .await
    }
}

fn require_endpoint(
    endpoint: &Option<Arc<dyn SparqlEndpoint>>,
) -> Result<Arc<dyn SparqlEndpoint>> {
    endpoint.as_ref().map(Arc::clone).ok_or_else(|| {
        Error::Config("sparql storage requires a SPARQL endpoint".to_string())
    })
}

/// Assemble the synthesis context from memory hits and corpuscles
fn build_answer_context(results: &[ScoredInteraction], corpuscles: &[Corpuscle]) -> String {
    let mut context = String::from("Relevant remembered interactions:\n");
    if results.is_empty() {
        context.push_str("(none)\n");
    }
    for hit in results {
        context.push_str(&format!(
            "- Q: {} A: {}\n",
            hit.interaction.prompt, hit.interaction.response
        ));
    }

    context.push_str("\nKnowledge graph results:\n");
    if corpuscles.is_empty() {
        context.push_str("(none)\n");
    }
    for corpuscle in corpuscles {
        let text = corpuscle
            .content
            .as_deref()
            .or(corpuscle.label.as_deref())
            .unwrap_or(corpuscle.uri.as_str());
        context.push_str(&format!("- {text}\n"));
    }
    context
}

//! SPARQL storage backend
//!
//! Mirrors each interaction into the content graph as a typed
//! `semem:Interaction` node. A single UPDATE is atomic at the endpoint;
//! the replace-then-insert pair used by `save_interaction` is idempotent,
//! so a retried save converges to the same graph state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::memory::interaction::{Interaction, MemoryTier};
use crate::sparql::builder::{
    delete_subject, insert_data, typed_literal, uri_ref, with_prefixes, TripleBlock,
};
use crate::sparql::{Binding, SparqlEndpoint};

use super::StorageBackend;

/// Graph-store mirror for interactions
pub struct SparqlBackend {
    endpoint: Arc<dyn SparqlEndpoint>,
    graph: String,
}

impl SparqlBackend {
    #[must_use]
    pub fn new(endpoint: Arc<dyn SparqlEndpoint>, graph: String) -> Self {
        Self { endpoint, graph }
    }

    fn render_triples(interaction: &Interaction) -> String {
        let subject = interaction.uri();
        let mut block = TripleBlock::new();
        block
            .push(&subject, "rdf:type", "semem:Interaction")
            .push_literal(&subject, "semem:prompt", &interaction.prompt)
            .push_literal(&subject, "semem:output", &interaction.response)
            .push(
                &subject,
                "dcterms:created",
                &typed_literal(&interaction.created.to_rfc3339(), "dateTime"),
            )
            .push(
                &subject,
                "semem:lastAccessed",
                &typed_literal(&interaction.last_accessed.to_rfc3339(), "dateTime"),
            )
            .push(
                &subject,
                "semem:accessCount",
                &typed_literal(&interaction.access_count.to_string(), "decimal"),
            )
            .push(
                &subject,
                "semem:relevanceScore",
                &typed_literal(&interaction.relevance_sum.to_string(), "decimal"),
            )
            .push_literal(&subject, "semem:tier", tier_label(interaction.tier));

        if let Some(embedding) = &interaction.embedding {
            let joined = embedding
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            block.push_literal(&subject, "semem:embedding", &joined);
        }
        for concept in &interaction.concepts {
            block.push_literal(&subject, "semem:concept", concept);
        }
        if let Some(source) = &interaction.source {
            block.push(&subject, "dcterms:source", &uri_ref(source));
        }

        block.render()
    }

    fn load_query(&self) -> String {
        let grouped_vars = "?interaction ?prompt ?output ?created ?lastAccessed \
                            ?accessCount ?relevanceScore ?tier ?embedding ?source";
        with_prefixes(&format!(
            r#"SELECT {grouped_vars} (GROUP_CONCAT(?concept; separator="|") AS ?concepts)
WHERE {{
  GRAPH <{graph}> {{
    ?interaction rdf:type semem:Interaction ;
        semem:prompt ?prompt ;
        semem:output ?output ;
        dcterms:created ?created ;
        semem:accessCount ?accessCount ;
        semem:tier ?tier .
    OPTIONAL {{ ?interaction semem:lastAccessed ?lastAccessed }}
    OPTIONAL {{ ?interaction semem:relevanceScore ?relevanceScore }}
    OPTIONAL {{ ?interaction semem:embedding ?embedding }}
    OPTIONAL {{ ?interaction dcterms:source ?source }}
    OPTIONAL {{ ?interaction semem:concept ?concept }}
  }}
}}
GROUP BY {grouped_vars}"#,
            graph = self.graph
        ))
    }

    fn parse_interaction(binding: &Binding) -> Result<Interaction> {
        let uri = term_value(binding, "interaction")
            .ok_or_else(|| Error::Protocol("binding is missing ?interaction".to_string()))?;
        let id = uri
            .rsplit('/')
            .next()
            .and_then(|tail| Uuid::parse_str(tail).ok())
            .ok_or_else(|| Error::Protocol(format!("interaction URI has no UUID tail: {uri}")))?;

        let created = parse_datetime(binding, "created")?;
        let last_accessed = match term_value(binding, "lastAccessed") {
            Some(_) => parse_datetime(binding, "lastAccessed")?,
            None => created,
        };

        let embedding = term_value(binding, "embedding").and_then(|raw| {
            let parsed: std::result::Result<Vec<f32>, _> =
                raw.split(',').map(str::parse::<f32>).collect();
            match parsed {
                Ok(values) if !values.is_empty() => Some(values),
                _ => {
                    tracing::warn!("discarding unparseable embedding literal for {}", uri);
                    None
                }
            }
        });

        let concepts = term_value(binding, "concepts")
            .map(|raw| {
                raw.split('|')
                    .filter(|c| !c.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Interaction {
            id,
            prompt: term_value(binding, "prompt").unwrap_or_default().to_string(),
            response: term_value(binding, "output").unwrap_or_default().to_string(),
            embedding,
            concepts,
            created,
            access_count: parse_f32(binding, "accessCount"),
            last_accessed,
            tier: match term_value(binding, "tier") {
                Some("long") => MemoryTier::Long,
                _ => MemoryTier::Short,
            },
            source: term_value(binding, "source").map(ToString::to_string),
            relevance_sum: parse_f32(binding, "relevanceScore"),
        })
    }
}

fn tier_label(tier: MemoryTier) -> &'static str {
    match tier {
        MemoryTier::Short => "short",
        MemoryTier::Long => "long",
    }
}

fn term_value<'a>(binding: &'a Binding, var: &str) -> Option<&'a str> {
    binding.get(var).map(|term| term.value.as_str())
}

fn parse_f32(binding: &Binding, var: &str) -> f32 {
    term_value(binding, var)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0.0)
}

fn parse_datetime(binding: &Binding, var: &str) -> Result<DateTime<Utc>> {
    let raw = term_value(binding, var)
        .ok_or_else(|| Error::Protocol(format!("binding is missing ?{var}")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Protocol(format!("bad {var} timestamp {raw:?}: {e}")))
}

#[async_trait]
impl StorageBackend for SparqlBackend {
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
        let subject = interaction.uri();
        self.endpoint
            .update(&delete_subject(&self.graph, &subject))
            .await?;
        self.endpoint
            .update(&insert_data(
                &self.graph,
                &Self::render_triples(interaction),
            ))
            .await
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        let results = self.endpoint.select(&self.load_query()).await?;
        let mut interactions = Vec::with_capacity(results.len());
        for binding in &results.results.bindings {
            match Self::parse_interaction(binding) {
                Ok(interaction) => interactions.push(interaction),
                Err(e) => tracing::warn!("skipping unparseable interaction row: {}", e),
            }
        }
        interactions.sort_by_key(|i| i.created);
        Ok(interactions)
    }

    async fn delete_interaction(&self, id: Uuid) -> Result<bool> {
        let subject = format!("{}/interaction/{}", crate::constants::vocab::URI_BASE, id);
        self.endpoint
            .update(&delete_subject(&self.graph, &subject))
            .await?;
        Ok(true)
    }
}

/// SPARQL backend with a read-through in-memory cache.
///
/// Reads are served from memory after the first load; writes go through to
/// the endpoint and update the cache in place.
pub struct CachedSparqlBackend {
    inner: SparqlBackend,
    cache: Mutex<Option<std::collections::HashMap<Uuid, Interaction>>>,
}

impl CachedSparqlBackend {
    #[must_use]
    pub fn new(endpoint: Arc<dyn SparqlEndpoint>, graph: String) -> Self {
        Self {
            inner: SparqlBackend::new(endpoint, graph),
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StorageBackend for CachedSparqlBackend {
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
        self.inner.save_interaction(interaction).await?;
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.as_mut() {
            records.insert(interaction.id, interaction.clone());
        }
        Ok(())
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            let loaded = self.inner.load_interactions().await?;
            *cache = Some(loaded.into_iter().map(|i| (i.id, i)).collect());
        }

        let mut interactions: Vec<Interaction> = cache
            .as_ref()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        interactions.sort_by_key(|i| i.created);
        Ok(interactions)
    }

    async fn delete_interaction(&self, id: Uuid) -> Result<bool> {
        let existed = self.inner.delete_interaction(id).await?;
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.as_mut() {
            records.remove(&id);
        }
        Ok(existed)
    }
}

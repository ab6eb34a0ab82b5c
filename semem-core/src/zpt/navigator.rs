//! ZPT navigator
//!
//! Executes navigation requests: builds the zoom/pan/tilt query, consults
//! the query cache, runs the SELECT, maps bindings to corpuscles, writes
//! navigation provenance, and keeps the session trail current.
//!
//! Cache policy: a cache hit bypasses execution entirely, including the
//! `NavigationView` provenance insert — provenance records work the
//! endpoint actually performed. The in-memory session history still logs
//! the hit with `from_cache = true` so session continuity is preserved.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::cache::{derive_key, QueryCache};
use crate::constants::vocab;
use crate::error::Result;
use crate::sparql::builder::{insert_data, typed_literal, uri_ref, TripleBlock};
use crate::sparql::{SparqlEndpoint, SparqlResults};

use super::params::NavigationParams;
use super::query::ZptQueryBuilder;
use super::session::{NavigationSession, NavigationView, SessionStore};

/// One retrieval unit: a node plus its ZPT-projected attributes
#[derive(Debug, Clone, Serialize)]
pub struct Corpuscle {
    pub uri: String,
    pub label: Option<String>,
    pub content: Option<String>,
    /// Zoom keyword the node was retrieved at
    pub zoom: String,
    /// Remaining projected bindings, keyed by variable name
    pub attributes: HashMap<String, String>,
}

/// Outcome metadata for one navigation
#[derive(Debug, Clone, Serialize)]
pub struct NavigationMetadata {
    pub session_id: String,
    pub zoom: String,
    pub tilt: String,
    pub result_count: usize,
    pub response_time_ms: u64,
    pub from_cache: bool,
}

/// Result of one navigation request
#[derive(Debug, Clone, Serialize)]
pub struct NavigationOutcome {
    pub corpuscles: Vec<Corpuscle>,
    pub metadata: NavigationMetadata,
}

/// Parameterized query planner over the knowledge graph
pub struct ZptNavigator {
    endpoint: Arc<dyn SparqlEndpoint>,
    cache: Arc<QueryCache>,
    sessions: Arc<SessionStore>,
    builder: ZptQueryBuilder,
    navigation_graph: String,
}

impl ZptNavigator {
    #[must_use]
    pub fn new(
        endpoint: Arc<dyn SparqlEndpoint>,
        cache: Arc<QueryCache>,
        sessions: SessionStore,
        content_graph: String,
        navigation_graph: String,
    ) -> Self {
        Self {
            endpoint,
            cache,
            sessions: Arc::new(sessions),
            builder: ZptQueryBuilder::new(content_graph),
            navigation_graph,
        }
    }

    /// Execute one navigation request within the identified session.
    ///
    /// # Errors
    ///
    /// Returns the endpoint's error when the SELECT fails; provenance and
    /// session-persistence failures are logged and non-fatal.
    pub async fn navigate(
        &self,
        params: &NavigationParams,
        session_id: Option<String>,
    ) -> Result<NavigationOutcome> {
        let session = self.sessions.initialize(session_id).await;
        let query = self.builder.build(params);
        let cache_key = derive_key(&query, self.endpoint.endpoint_url());

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!("navigation served from cache for session {}", session.id);
            let corpuscles = bindings_to_corpuscles(&cached, params);
            let outcome = self.finish(&session, params, corpuscles, 0, true);
            return Ok(outcome);
        }

        let started = Instant::now();
        let results = self.endpoint.select(&query).await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        self.cache
            .put(cache_key, Arc::new(results.clone()), None);

        let corpuscles = bindings_to_corpuscles(&results, params);
        if let Err(e) = self
            .insert_provenance(&session, params, corpuscles.len(), response_time_ms)
            .await
        {
            tracing::warn!("navigation provenance write failed: {}", e);
        }

        let outcome = self.finish(&session, params, corpuscles, response_time_ms, false);

        if let Some(updated) = self.sessions.get(&session.id) {
            if let Err(e) = self.sessions.persist(&updated).await {
                tracing::warn!("session persistence failed for {}: {}", updated.id, e);
            }
        }

        Ok(outcome)
    }

    /// Restore or create a session
    pub async fn initialize_session(&self, session_id: Option<String>) -> NavigationSession {
        self.sessions.initialize(session_id).await
    }

    /// Expire idle sessions
    pub async fn sweep_sessions(&self) -> Vec<String> {
        self.sessions.sweep().await
    }

    /// The session registry, for inspection
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Shared handle to the session registry, for the periodic sweeper
    #[must_use]
    pub fn sessions_handle(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    fn finish(
        &self,
        session: &NavigationSession,
        params: &NavigationParams,
        corpuscles: Vec<Corpuscle>,
        response_time_ms: u64,
        from_cache: bool,
    ) -> NavigationOutcome {
        let view = NavigationView {
            params: params.clone(),
            result_count: corpuscles.len(),
            response_time_ms,
            from_cache,
            timestamp: Utc::now(),
        };
        self.sessions.record_view(&session.id, view);

        NavigationOutcome {
            metadata: NavigationMetadata {
                session_id: session.id.clone(),
                zoom: params.zoom.as_str().to_string(),
                tilt: params.tilt.as_str().to_string(),
                result_count: corpuscles.len(),
                response_time_ms,
                from_cache,
            },
            corpuscles,
        }
    }

    async fn insert_provenance(
        &self,
        session: &NavigationSession,
        params: &NavigationParams,
        result_count: usize,
        response_time_ms: u64,
    ) -> Result<()> {
        let view_uri = format!("{}/view/{}", vocab::URI_BASE, Uuid::new_v4());
        let mut block = TripleBlock::new();
        block
            .push(&view_uri, "rdf:type", "zpt:NavigationView")
            .push(&view_uri, "zpt:partOfSession", &uri_ref(&session.uri()))
            .push_literal(&view_uri, "zpt:query", &params.query)
            .push_literal(&view_uri, "zpt:atZoom", params.zoom.as_str())
            .push_literal(&view_uri, "zpt:withTilt", params.tilt.as_str())
            .push(
                &view_uri,
                "zpt:resultCount",
                &typed_literal(&result_count.to_string(), "integer"),
            )
            .push(
                &view_uri,
                "zpt:responseTime",
                &typed_literal(&response_time_ms.to_string(), "integer"),
            )
            .push(
                &view_uri,
                "dcterms:created",
                &typed_literal(&Utc::now().to_rfc3339(), "dateTime"),
            );

        self.endpoint
            .update(&insert_data(&self.navigation_graph, &block.render()))
            .await
    }
}

/// Map SELECT bindings into corpuscles, keeping unclaimed projections as
/// string attributes.
fn bindings_to_corpuscles(results: &SparqlResults, params: &NavigationParams) -> Vec<Corpuscle> {
    results
        .results
        .bindings
        .iter()
        .filter_map(|binding| {
            let uri = binding.get("node")?.value.clone();
            let mut attributes = HashMap::new();
            let mut label = None;
            let mut content = None;

            for (var, term) in binding {
                match var.as_str() {
                    "node" => {}
                    "label" => label = Some(term.value.clone()),
                    "content" => content = Some(term.value.clone()),
                    other => {
                        attributes.insert(other.to_string(), term.value.clone());
                    }
                }
            }

            Some(Corpuscle {
                uri,
                label,
                content,
                zoom: params.zoom.as_str().to_string(),
                attributes,
            })
        })
        .collect()
}

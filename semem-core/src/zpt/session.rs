//! Navigation sessions
//!
//! A session is the persistent interaction trail behind a sequence of
//! navigate calls: current ZPT state, a bounded history of navigation
//! views, and activity timestamps. Sessions live in memory, are mirrored
//! into the session graph as a JSON blob plus typed triples, and are
//! restorable from the graph alone.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::constants::{defaults, vocab};
use crate::error::Result;
use crate::sparql::builder::{
    delete_subject, insert_data, literal, typed_literal, TripleBlock, with_prefixes,
};
use crate::sparql::SparqlEndpoint;

use super::params::{NavigationParams, PanFilter, TiltProjection, ZoomLevel};

/// Provenance record of one executed navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationView {
    pub params: NavigationParams,
    pub result_count: usize,
    pub response_time_ms: u64,
    pub from_cache: bool,
    pub timestamp: DateTime<Utc>,
}

/// Current ZPT position of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZptState {
    pub zoom: ZoomLevel,
    pub pan: PanFilter,
    pub tilt: TiltProjection,
    pub last_query: Option<String>,
}

/// One navigation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationSession {
    pub id: String,
    pub created: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub state: ZptState,
    pub interactions: u64,
    pub history: Vec<NavigationView>,
}

impl NavigationSession {
    /// Create a fresh session
    #[must_use]
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created: now,
            last_activity: now,
            state: ZptState::default(),
            interactions: 0,
            history: Vec::new(),
        }
    }

    /// The RDF node URI this session is mirrored under
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}/session/{}", vocab::URI_BASE, self.id)
    }

    /// Apply one navigation: update state, bump the interaction clock, and
    /// append the view to the bounded history.
    pub fn record_view(&mut self, view: NavigationView) {
        self.state = ZptState {
            zoom: view.params.zoom,
            pan: view.params.pan.clone(),
            tilt: view.params.tilt,
            last_query: Some(view.params.query.clone()),
        };
        self.last_activity = view.timestamp;
        self.interactions += 1;
        self.history.push(view);
        if self.history.len() > defaults::SESSION_HISTORY_LIMIT {
            let overflow = self.history.len() - defaults::SESSION_HISTORY_LIMIT;
            self.history.drain(..overflow);
        }
    }
}

/// In-memory session registry with graph-store mirroring
pub struct SessionStore {
    sessions: RwLock<HashMap<String, NavigationSession>>,
    timeout: Duration,
    endpoint: Option<Arc<dyn SparqlEndpoint>>,
    graph: String,
}

impl SessionStore {
    #[must_use]
    pub fn new(endpoint: Option<Arc<dyn SparqlEndpoint>>, graph: String) -> Self {
        Self::with_timeout(endpoint, graph, defaults::SESSION_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(
        endpoint: Option<Arc<dyn SparqlEndpoint>>,
        graph: String,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            endpoint,
            graph,
        }
    }

    /// Return the identified session, restoring it from the graph store or
    /// creating it when unknown. Without an id a new session is minted and
    /// no restoration is attempted.
    pub async fn initialize(&self, session_id: Option<String>) -> NavigationSession {
        let Some(id) = session_id else {
            let session = NavigationSession::new(Uuid::new_v4().to_string());
            self.sessions
                .write()
                .insert(session.id.clone(), session.clone());
            return session;
        };

        if let Some(session) = self.sessions.read().get(&id) {
            return session.clone();
        }

        if let Some(session) = self.restore(&id).await {
            self.sessions
                .write()
                .insert(session.id.clone(), session.clone());
            return session;
        }

        let session = NavigationSession::new(id);
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session without creating it
    #[must_use]
    pub fn get(&self, id: &str) -> Option<NavigationSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Apply a view to a session and return the updated copy
    pub fn record_view(&self, id: &str, view: NavigationView) -> Option<NavigationSession> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id)?;
        session.record_view(view);
        Some(session.clone())
    }

    /// Mirror a session into the session graph as typed triples plus a
    /// JSON blob the session can be rebuilt from.
    ///
    /// # Errors
    ///
    /// Returns the endpoint's error; callers treat persistence as
    /// non-fatal.
    pub async fn persist(&self, session: &NavigationSession) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let subject = session.uri();
        let blob = serde_json::to_string(session)?;

        let mut block = TripleBlock::new();
        block
            .push(&subject, "rdf:type", "zpt:NavigationSession")
            .push_literal(&subject, "zpt:sessionId", &session.id)
            .push(
                &subject,
                "dcterms:created",
                &typed_literal(&session.created.to_rfc3339(), "dateTime"),
            )
            .push(
                &subject,
                "zpt:lastActivity",
                &typed_literal(&session.last_activity.to_rfc3339(), "dateTime"),
            )
            .push(
                &subject,
                "zpt:interactionCount",
                &typed_literal(&session.interactions.to_string(), "integer"),
            )
            .push_literal(&subject, "zpt:currentZoom", session.state.zoom.as_str())
            .push_literal(&subject, "zpt:currentTilt", session.state.tilt.as_str())
            .push_literal(&subject, "zpt:stateJson", &blob);

        endpoint.update(&delete_subject(&self.graph, &subject)).await?;
        endpoint
            .update(&insert_data(&self.graph, &block.render()))
            .await
    }

    /// Rebuild a session from its stored JSON blob.
    ///
    /// Returns `None` when the session is absent or its blob does not
    /// parse; the caller then starts a fresh session.
    async fn restore(&self, id: &str) -> Option<NavigationSession> {
        let endpoint = self.endpoint.as_ref()?;

        let query = with_prefixes(&format!(
            "SELECT ?blob WHERE {{\n  GRAPH <{}> {{\n    ?session rdf:type zpt:NavigationSession ;\n        zpt:sessionId {} ;\n        zpt:stateJson ?blob .\n  }}\n}}\nLIMIT 1",
            self.graph,
            literal(id)
        ));

        let results = match endpoint.select(&query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("session restore query failed for {}: {}", id, e);
                return None;
            }
        };

        let blob = results.first_value("blob")?;
        match serde_json::from_str::<NavigationSession>(blob) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("stored session blob for {} does not parse: {}", id, e);
                None
            }
        }
    }

    /// Expire idle sessions, removing them from memory and best-effort
    /// deleting their graph mirror. Returns the expired session ids.
    pub async fn sweep(&self) -> Vec<String> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::hours(1));

        let expired: Vec<NavigationSession> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| now - s.last_activity > timeout)
                .map(|s| s.id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        if let Some(endpoint) = &self.endpoint {
            for session in &expired {
                if let Err(e) = endpoint
                    .update(&delete_subject(&self.graph, &session.uri()))
                    .await
                {
                    tracing::warn!("could not delete expired session {}: {}", session.id, e);
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!("expired {} idle navigation sessions", expired.len());
        }
        expired.into_iter().map(|s| s.id).collect()
    }

    /// Spawn a periodic sweep of idle sessions.
    ///
    /// The returned handle can be aborted on shutdown.
    pub fn spawn_sweeper(
        store: Arc<SessionStore>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(query: &str, zoom: ZoomLevel) -> NavigationView {
        NavigationView {
            params: NavigationParams {
                query: query.to_string(),
                zoom,
                pan: PanFilter::default(),
                tilt: TiltProjection::Keywords,
            },
            result_count: 3,
            response_time_ms: 12,
            from_cache: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_view_updates_state_and_clock() {
        let mut session = NavigationSession::new("s1".to_string());
        session.record_view(view("AI", ZoomLevel::Community));
        session.record_view(view("AI", ZoomLevel::Unit));

        assert_eq!(session.interactions, 2);
        assert_eq!(session.state.zoom, ZoomLevel::Unit);
        assert_eq!(session.state.last_query.as_deref(), Some("AI"));
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = NavigationSession::new("s1".to_string());
        for i in 0..defaults::SESSION_HISTORY_LIMIT + 10 {
            session.record_view(view(&format!("q{i}"), ZoomLevel::Entity));
        }

        assert_eq!(session.history.len(), defaults::SESSION_HISTORY_LIMIT);
        // the oldest views are the ones dropped
        assert_eq!(session.history[0].params.query, "q10");
    }

    #[tokio::test]
    async fn test_initialize_without_id_mints_session() {
        let store = SessionStore::new(None, vocab::SESSION_GRAPH.to_string());
        let session = store.initialize(None).await;
        assert_eq!(session.interactions, 0);
        assert!(store.get(&session.id).is_some());
    }

    #[tokio::test]
    async fn test_initialize_with_known_id_returns_same_session() {
        let store = SessionStore::new(None, vocab::SESSION_GRAPH.to_string());
        let first = store.initialize(Some("fixed".to_string())).await;
        store.record_view(&first.id, view("AI", ZoomLevel::Entity));

        let second = store.initialize(Some("fixed".to_string())).await;
        assert_eq!(second.interactions, 1);
        assert_eq!(second.state.zoom, ZoomLevel::Entity);
    }

    #[tokio::test]
    async fn test_sweep_expires_idle_sessions() {
        let store = SessionStore::with_timeout(
            None,
            vocab::SESSION_GRAPH.to_string(),
            Duration::from_millis(10),
        );
        let session = store.initialize(Some("idle".to_string())).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        let expired = store.sweep().await;

        assert_eq!(expired, vec![session.id]);
        assert!(store.get("idle").is_none());
    }

    #[test]
    fn test_session_blob_round_trips() {
        let mut session = NavigationSession::new("blob".to_string());
        session.record_view(view("AI", ZoomLevel::Community));

        let blob = serde_json::to_string(&session).unwrap();
        let restored: NavigationSession = serde_json::from_str(&blob).unwrap();

        assert_eq!(restored.id, session.id);
        assert_eq!(restored.state, session.state);
        assert_eq!(restored.history.len(), 1);
    }
}

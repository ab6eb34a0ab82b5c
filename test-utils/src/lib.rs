//! Testing utilities for semem-core
//!
//! The scripted chat provider and the deterministic hashing embedder live
//! in `semem_core` itself (they also serve offline profiles); this crate
//! adds the SPARQL endpoint double tests wire the navigator and storage
//! backends against, plus binding-row builders for canned results.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use semem_core::sparql::{Binding, RdfTerm, SparqlEndpoint, SparqlResults};
use semem_core::Result;

pub use semem_core::embeddings::MockEmbeddingProvider;
pub use semem_core::llm::MockChatProvider;

/// SPARQL endpoint double that records traffic and replays scripted results.
///
/// Scripted results are consumed per SELECT in FIFO order; once exhausted
/// the configured default result (empty unless set) is returned. An
/// optional artificial SELECT delay makes cache-hit timing observable.
pub struct RecordingSparqlEndpoint {
    selects: Mutex<Vec<String>>,
    updates: Mutex<Vec<String>>,
    scripted: Mutex<VecDeque<SparqlResults>>,
    default_result: Mutex<SparqlResults>,
    select_delay: Mutex<Option<Duration>>,
    fail_updates: Mutex<bool>,
}

impl RecordingSparqlEndpoint {
    #[must_use]
    pub fn new() -> Self {
        Self {
            selects: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            default_result: Mutex::new(SparqlResults::empty()),
            select_delay: Mutex::new(None),
            fail_updates: Mutex::new(false),
        }
    }

    /// Queue one scripted SELECT result
    pub fn push_result(&self, results: SparqlResults) {
        self.scripted.lock().push_back(results);
    }

    /// Result returned once the script is exhausted
    pub fn set_default_result(&self, results: SparqlResults) {
        *self.default_result.lock() = results;
    }

    /// Artificial latency added to every SELECT
    pub fn set_select_delay(&self, delay: Duration) {
        *self.select_delay.lock() = Some(delay);
    }

    /// Make every UPDATE fail, for provenance-isolation tests
    pub fn fail_updates(&self, fail: bool) {
        *self.fail_updates.lock() = fail;
    }

    /// Every SELECT query observed, in call order
    #[must_use]
    pub fn selects(&self) -> Vec<String> {
        self.selects.lock().clone()
    }

    /// Every UPDATE observed, in call order
    #[must_use]
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().clone()
    }

    /// Number of SELECTs observed
    #[must_use]
    pub fn select_count(&self) -> usize {
        self.selects.lock().len()
    }

    /// UPDATEs containing `needle`
    #[must_use]
    pub fn updates_containing(&self, needle: &str) -> Vec<String> {
        self.updates
            .lock()
            .iter()
            .filter(|update| update.contains(needle))
            .cloned()
            .collect()
    }
}

impl Default for RecordingSparqlEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SparqlEndpoint for RecordingSparqlEndpoint {
    async fn select(&self, query: &str) -> Result<SparqlResults> {
        self.selects.lock().push(query.to_string());

        let delay = *self.select_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.scripted.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_result.lock().clone()))
    }

    async fn update(&self, update: &str) -> Result<()> {
        if *self.fail_updates.lock() {
            return Err(semem_core::Error::Http(
                "endpoint rejects updates".to_string(),
            ));
        }
        self.updates.lock().push(update.to_string());
        Ok(())
    }

    fn endpoint_url(&self) -> &str {
        "http://localhost:3030/test/query"
    }
}

/// Build one binding row for a knowledge node
#[must_use]
pub fn node_row(uri: &str, label: &str, content: &str) -> Binding {
    let mut row = Binding::new();
    row.insert("node".to_string(), RdfTerm::uri(uri));
    row.insert("label".to_string(), RdfTerm::literal(label));
    row.insert("content".to_string(), RdfTerm::literal(content));
    row
}

/// Add a creation timestamp to a binding row
#[must_use]
pub fn with_created(mut row: Binding, created: &str) -> Binding {
    row.insert("created".to_string(), RdfTerm::literal(created));
    row
}

/// Assemble rows into a SELECT result document
#[must_use]
pub fn results_from_rows(rows: Vec<Binding>) -> SparqlResults {
    let mut results = SparqlResults::empty();
    results.head.vars = vec![
        "node".to_string(),
        "label".to_string(),
        "content".to_string(),
    ];
    results.results.bindings = rows;
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_results_replay_in_order() {
        let endpoint = RecordingSparqlEndpoint::new();
        endpoint.push_result(results_from_rows(vec![node_row("http://x/1", "a", "c")]));

        let first = endpoint.select("SELECT 1").await.unwrap();
        let second = endpoint.select("SELECT 2").await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(endpoint.selects(), vec!["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn test_update_recording_and_failure() {
        let endpoint = RecordingSparqlEndpoint::new();
        endpoint.update("INSERT DATA { }").await.unwrap();
        assert_eq!(endpoint.updates_containing("INSERT").len(), 1);

        endpoint.fail_updates(true);
        assert!(endpoint.update("INSERT DATA { }").await.is_err());
    }
}

//! Storage abstraction
//!
//! Unified trait over persistence backends. The graph store is the system
//! of record when SPARQL storage is configured; the in-memory and JSON
//! backends serve development and single-node profiles.

pub mod json;
pub mod sparql_store;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::interaction::Interaction;

pub use json::JsonBackend;
pub use sparql_store::{CachedSparqlBackend, SparqlBackend};

/// Unified storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert or replace one interaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` when the write fails.
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()>;

    /// Load every persisted interaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` when the read fails.
    async fn load_interactions(&self) -> Result<Vec<Interaction>>;

    /// Remove one interaction; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` when the delete fails.
    async fn delete_interaction(&self, id: Uuid) -> Result<bool>;
}

/// Volatile in-process backend
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<Uuid, Interaction>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
        self.records
            .lock()
            .insert(interaction.id, interaction.clone());
        Ok(())
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn delete_interaction(&self, id: Uuid) -> Result<bool> {
        Ok(self.records.lock().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(prompt: &str) -> Interaction {
        Interaction::new(prompt.to_string(), "a".to_string(), None, vec![], None)
    }

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        let record = interaction("q1");
        backend.save_interaction(&record).await.unwrap();

        let loaded = backend.load_interactions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].prompt, "q1");

        assert!(backend.delete_interaction(record.id).await.unwrap());
        assert!(!backend.delete_interaction(record.id).await.unwrap());
        assert!(backend.load_interactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let backend = MemoryBackend::new();
        let mut record = interaction("q");
        backend.save_interaction(&record).await.unwrap();

        record.access_count = 3.0;
        backend.save_interaction(&record).await.unwrap();

        let loaded = backend.load_interactions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].access_count, 3.0);
    }
}

//! Interaction records and memory snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::vocab;

/// Memory tier an interaction lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    /// Bounded working set
    Short,
    /// Unbounded consolidated store
    Long,
}

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Stable identifier
    pub id: Uuid,
    /// Prompt text as ingested
    pub prompt: String,
    /// Response text as ingested
    pub response: String,
    /// Embedding vector; `None` marks the record pending-embedding and
    /// excludes it from similarity search
    pub embedding: Option<Vec<f32>>,
    /// Normalized concept labels
    pub concepts: Vec<String>,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// Access count; decays multiplicatively, hence fractional
    pub access_count: f32,
    /// Last retrieval timestamp
    pub last_accessed: DateTime<Utc>,
    /// Current tier
    pub tier: MemoryTier,
    /// Optional source URI
    pub source: Option<String>,
    /// Accumulated retrieval score driving promotion
    pub relevance_sum: f32,
}

impl Interaction {
    /// Create a new short-term interaction
    #[must_use]
    pub fn new(
        prompt: String,
        response: String,
        embedding: Option<Vec<f32>>,
        concepts: Vec<String>,
        source: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prompt,
            response,
            embedding,
            concepts,
            created: now,
            access_count: 0.0,
            last_accessed: now,
            tier: MemoryTier::Short,
            source,
            relevance_sum: 0.0,
        }
    }

    /// Whether the record is excluded from similarity search
    #[must_use]
    pub fn is_pending_embedding(&self) -> bool {
        self.embedding.is_none()
    }

    /// The RDF node URI this interaction is mirrored under
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}/interaction/{}", vocab::URI_BASE, self.id)
    }
}

/// Immutable view over both tiers, handed to readers as one `Arc`
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    pub short_term: Vec<Interaction>,
    pub long_term: Vec<Interaction>,
}

impl MemorySnapshot {
    /// Iterate one tier, or both fused when `tier` is `None`
    pub fn iter_tier(&self, tier: Option<MemoryTier>) -> impl Iterator<Item = &Interaction> {
        let short = match tier {
            Some(MemoryTier::Long) => &[] as &[Interaction],
            _ => self.short_term.as_slice(),
        };
        let long = match tier {
            Some(MemoryTier::Short) => &[] as &[Interaction],
            _ => self.long_term.as_slice(),
        };
        short.iter().chain(long.iter())
    }

    /// Total number of interactions in view
    #[must_use]
    pub fn len(&self) -> usize {
        self.short_term.len() + self.long_term.len()
    }

    /// Whether both tiers are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.long_term.is_empty()
    }
}

//! Composite retrieval scoring
//!
//! `score = α·cosine01(qEmb, iEmb) + β·jaccard(qConcepts, iConcepts)
//!        + γ·exp(−decayRate·ageSeconds)`
//!
//! The weights are tunable constants surfaced through `MemorySettings`.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::MemorySettings;
use crate::embeddings::similarity::cosine_similarity_01;

use super::interaction::Interaction;

/// Weight triple for the composite score
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub similarity: f32,
    pub concepts: f32,
    pub recency: f32,
}

impl From<&MemorySettings> for ScoreWeights {
    fn from(settings: &MemorySettings) -> Self {
        Self {
            similarity: settings.similarity_weight,
            concepts: settings.concept_weight,
            recency: settings.recency_weight,
        }
    }
}

/// Per-factor breakdown of one composite score
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ScoreBreakdown {
    pub composite: f32,
    pub similarity: f32,
    pub concept_overlap: f32,
    pub recency: f32,
}

/// A retrieval hit with its breakdown
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredInteraction {
    pub interaction: Interaction,
    pub score: ScoreBreakdown,
}

/// Jaccard overlap of two concept sets in [0, 1].
///
/// Two empty sets overlap fully; one empty set overlaps not at all.
#[must_use]
pub fn concept_jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Exponential time-decay boost in (0, 1]
#[must_use]
pub fn recency_boost(age_seconds: f32, decay_rate: f32) -> f32 {
    (-decay_rate * age_seconds.max(0.0)).exp()
}

/// Score one interaction against a query.
///
/// Returns `None` for pending-embedding records; they are excluded from
/// similarity search rather than scored at zero.
#[must_use]
pub fn score_interaction(
    query_embedding: &[f32],
    query_concepts: &[String],
    interaction: &Interaction,
    now: DateTime<Utc>,
    weights: ScoreWeights,
    decay_rate: f32,
) -> Option<ScoreBreakdown> {
    let embedding = interaction.embedding.as_ref()?;

    let similarity = cosine_similarity_01(query_embedding, embedding);
    let concept_overlap = concept_jaccard(query_concepts, &interaction.concepts);
    let age_seconds = (now - interaction.created).num_milliseconds() as f32 / 1000.0;
    let recency = recency_boost(age_seconds, decay_rate);

    let composite = weights.similarity * similarity
        + weights.concepts * concept_overlap
        + weights.recency * recency;

    Some(ScoreBreakdown {
        composite,
        similarity,
        concept_overlap,
        recency,
    })
}

//! Two-tier memory store
//!
//! Owns the interaction lifecycle in-process: ingest into the short-term
//! working set, composite-scored retrieval over one or both tiers,
//! promotion into long-term, and access-count decay. Every mutation
//! invalidates the memory-data cache and the query cache and schedules a
//! debounced write-through to the configured backend.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{DebouncedPersister, MemoryDataCache, QueryCache};
use crate::config::MemorySettings;
use crate::constants::defaults;
use crate::error::Result;
use crate::storage::StorageBackend;

use super::interaction::{Interaction, MemorySnapshot, MemoryTier};
use super::ranking::{score_interaction, ScoreWeights, ScoredInteraction};

#[derive(Default)]
struct MemoryState {
    short: Vec<Interaction>,
    long: Vec<Interaction>,
    last_decay: Option<chrono::DateTime<Utc>>,
}

/// Two-tier memory with composite-scored retrieval
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    dirty: Arc<Mutex<HashSet<Uuid>>>,
    settings: MemorySettings,
    backend: Arc<dyn StorageBackend>,
    query_cache: Arc<QueryCache>,
    data_cache: MemoryDataCache<MemorySnapshot>,
    persister: DebouncedPersister,
}

impl MemoryStore {
    #[must_use]
    pub fn new(
        settings: MemorySettings,
        backend: Arc<dyn StorageBackend>,
        query_cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            dirty: Arc::new(Mutex::new(HashSet::new())),
            settings,
            backend,
            query_cache,
            data_cache: MemoryDataCache::new(),
            persister: DebouncedPersister::new(defaults::PERSIST_DEBOUNCE),
        }
    }

    /// Load persisted interactions from the backend into their tiers.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when loading fails.
    pub async fn initialize(&self) -> Result<()> {
        let interactions = self.backend.load_interactions().await?;
        let mut state = self.state.write();
        state.short.clear();
        state.long.clear();
        for interaction in interactions {
            match interaction.tier {
                MemoryTier::Short => state.short.push(interaction),
                MemoryTier::Long => state.long.push(interaction),
            }
        }
        drop(state);
        self.data_cache.invalidate();
        Ok(())
    }

    /// Record a new interaction in the short-term tier.
    ///
    /// An embedding with the wrong dimension is discarded; the record is
    /// then pending-embedding and excluded from similarity search. When the
    /// working set is at capacity a promotion pass runs before the append.
    pub fn add_interaction(
        &self,
        prompt: String,
        response: String,
        embedding: Option<Vec<f32>>,
        concepts: Vec<String>,
        source: Option<String>,
    ) -> Interaction {
        let embedding = embedding.and_then(|vector| {
            if vector.len() == self.settings.dimension {
                Some(vector)
            } else {
                tracing::warn!(
                    "discarding {}-dimension embedding (configured {}); interaction is pending-embedding",
                    vector.len(),
                    self.settings.dimension
                );
                None
            }
        });

        let interaction = Interaction::new(prompt, response, embedding, concepts, source);

        {
            let mut state = self.state.write();
            if state.short.len() >= self.settings.short_term_capacity {
                let promoted = self.promote_locked(&mut state);
                if promoted.is_empty() {
                    tracing::debug!(
                        "short-term memory over capacity ({}) with nothing promotable",
                        state.short.len()
                    );
                }
                let mut dirty = self.dirty.lock();
                dirty.extend(promoted);
            }
            state.short.push(interaction.clone());
            self.dirty.lock().insert(interaction.id);
        }

        self.invalidate_caches();
        self.schedule_flush();
        interaction
    }

    /// Retrieve the `limit` most relevant interactions for a query.
    ///
    /// Only records whose composite score clears the similarity threshold
    /// are returned; ties break toward recency. `tier` restricts the search
    /// to one tier, `None` fuses both. Returned records get their access
    /// counters bumped and their relevance accumulated for promotion.
    pub fn retrieve_relevant(
        &self,
        query_embedding: &[f32],
        query_concepts: &[String],
        limit: usize,
        tier: Option<MemoryTier>,
    ) -> Vec<ScoredInteraction> {
        if limit == 0 {
            return Vec::new();
        }

        let now = Utc::now();
        let weights = ScoreWeights::from(&self.settings);
        let snapshot = self.snapshot();

        let mut scored: Vec<ScoredInteraction> = snapshot
            .iter_tier(tier)
            .filter_map(|interaction| {
                score_interaction(
                    query_embedding,
                    query_concepts,
                    interaction,
                    now,
                    weights,
                    self.settings.decay_rate,
                )
                .filter(|score| score.composite >= self.settings.similarity_threshold)
                .map(|score| ScoredInteraction {
                    interaction: interaction.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .composite
                .partial_cmp(&a.score.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.interaction.created.cmp(&a.interaction.created))
        });
        scored.truncate(limit);

        if !scored.is_empty() {
            let mut state = self.state.write();
            let mut dirty = self.dirty.lock();
            for hit in &scored {
                if let Some(record) = find_mut(&mut state, hit.interaction.id) {
                    record.access_count += 1.0;
                    record.last_accessed = now;
                    record.relevance_sum += hit.score.composite;
                    dirty.insert(record.id);
                }
            }
            drop(dirty);
            drop(state);
            self.data_cache.invalidate();
            self.schedule_flush();
        }

        scored
    }

    /// Move qualifying short-term interactions to long-term.
    ///
    /// An interaction qualifies when its accumulated relevance clears the
    /// promotion threshold and it has been accessed at least the configured
    /// minimum number of times. Promotion is idempotent; a promoted record
    /// leaves the working set and cannot qualify again.
    pub fn promote(&self) -> Vec<Uuid> {
        let promoted = {
            let mut state = self.state.write();
            self.promote_locked(&mut state)
        };

        if !promoted.is_empty() {
            self.dirty.lock().extend(promoted.iter().copied());
            self.invalidate_caches();
            self.schedule_flush();
        }
        promoted
    }

    fn promote_locked(&self, state: &mut MemoryState) -> Vec<Uuid> {
        let threshold = self.settings.promotion_threshold;
        let min_access = self.settings.promotion_min_access;

        let mut promoted = Vec::new();
        let mut remaining = Vec::with_capacity(state.short.len());
        for mut interaction in state.short.drain(..) {
            if interaction.relevance_sum >= threshold && interaction.access_count >= min_access {
                interaction.tier = MemoryTier::Long;
                promoted.push(interaction.id);
                state.long.push(interaction);
            } else {
                remaining.push(interaction);
            }
        }
        state.short = remaining;

        if !promoted.is_empty() {
            tracing::info!("promoted {} interactions to long-term memory", promoted.len());
        }
        promoted
    }

    /// Apply time decay to every access counter.
    ///
    /// Counters are multiplied by `1 − decayRate·Δt`, clipped at zero, where
    /// Δt is the time since the previous decay pass.
    pub fn decay(&self) {
        let now = Utc::now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let elapsed = state
            .last_decay
            .map_or(0.0, |last| (now - last).num_milliseconds() as f32 / 1000.0);
        state.last_decay = Some(now);
        if elapsed <= 0.0 {
            return;
        }

        let factor = (1.0 - self.settings.decay_rate * elapsed).clamp(0.0, 1.0);
        let mut dirty = self.dirty.lock();
        for interaction in state.short.iter_mut().chain(state.long.iter_mut()) {
            interaction.access_count *= factor;
            dirty.insert(interaction.id);
        }
        drop(dirty);
        drop(guard);

        self.data_cache.invalidate();
        self.schedule_flush();
    }

    /// Administratively delete one interaction.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the durable delete fails.
    pub async fn delete_interaction(&self, id: Uuid) -> Result<bool> {
        let existed = {
            let mut state = self.state.write();
            let before = state.short.len() + state.long.len();
            state.short.retain(|i| i.id != id);
            state.long.retain(|i| i.id != id);
            before != state.short.len() + state.long.len()
        };
        self.dirty.lock().remove(&id);
        self.invalidate_caches();

        let in_backend = self.backend.delete_interaction(id).await?;
        Ok(existed || in_backend)
    }

    /// Consistent snapshot over both tiers
    #[must_use]
    pub fn snapshot(&self) -> Arc<MemorySnapshot> {
        if let Some(snapshot) = self.data_cache.get() {
            return snapshot;
        }

        let state = self.state.read();
        let snapshot = Arc::new(MemorySnapshot {
            short_term: state.short.clone(),
            long_term: state.long.clone(),
        });
        drop(state);
        self.data_cache.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Number of interactions in the short-term working set
    #[must_use]
    pub fn short_term_len(&self) -> usize {
        self.state.read().short.len()
    }

    /// Number of interactions in the long-term store
    #[must_use]
    pub fn long_term_len(&self) -> usize {
        self.state.read().long.len()
    }

    /// The configured memory settings
    #[must_use]
    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Resolve pending writes: drain them when `drain`, discard otherwise.
    pub async fn shutdown(&self, drain: bool) {
        self.persister.shutdown(drain).await;
    }

    /// Spawn a periodic decay pass over the store.
    ///
    /// The returned handle can be aborted on shutdown.
    pub fn spawn_decay(
        store: Arc<MemoryStore>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.decay();
            }
        })
    }

    fn invalidate_caches(&self) {
        self.data_cache.invalidate();
        // Query-cache keys are fingerprints of SPARQL text; they cannot be
        // mapped back to the graph regions an ingest touches, so mutations
        // drop the whole cache.
        self.query_cache.clear();
    }

    fn schedule_flush(&self) {
        let state = Arc::clone(&self.state);
        let dirty = Arc::clone(&self.dirty);
        let backend = Arc::clone(&self.backend);

        self.persister.schedule(move || {
            Box::pin(async move {
                let ids: HashSet<Uuid> = {
                    let mut dirty = dirty.lock();
                    dirty.drain().collect()
                };
                if ids.is_empty() {
                    return Ok(());
                }

                let records: Vec<Interaction> = {
                    let state = state.read();
                    state
                        .short
                        .iter()
                        .chain(state.long.iter())
                        .filter(|i| ids.contains(&i.id))
                        .cloned()
                        .collect()
                };

                for record in &records {
                    backend.save_interaction(record).await?;
                }
                tracing::debug!("persisted {} interactions", records.len());
                Ok(())
            })
        });
    }
}

fn find_mut(state: &mut MemoryState, id: Uuid) -> Option<&mut Interaction> {
    if let Some(pos) = state.short.iter().position(|i| i.id == id) {
        return state.short.get_mut(pos);
    }
    if let Some(pos) = state.long.iter().position(|i| i.id == id) {
        return state.long.get_mut(pos);
    }
    None
}

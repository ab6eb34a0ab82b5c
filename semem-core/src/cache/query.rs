//! Query-result cache
//!
//! Bounded cache of raw SPARQL bindings keyed by a fingerprint of the
//! normalized query text and endpoint URL. TTL per entry with a default;
//! eviction at capacity removes the oldest entry by insertion time — reads
//! deliberately use `peek` so access never refreshes eviction order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::defaults;
use crate::error::{Error, Result};
use crate::sparql::SparqlResults;

/// One cached result with its expiry
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<SparqlResults>,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Cache counters for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheMetrics {
    /// Cache hit rate in [0, 1]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Derive the deterministic cache key for a query/endpoint pair.
///
/// Whitespace runs in the query are collapsed first, so queries differing
/// only in formatting share a key.
#[must_use]
pub fn derive_key(query: &str, endpoint: &str) -> String {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut encoded = BASE64.encode(normalized);
    encoded.truncate(defaults::CACHE_KEY_PREFIX_LEN);
    format!("{encoded}:{endpoint}")
}

/// TTL + oldest-insert-eviction cache for SPARQL results
pub struct QueryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    metrics: Mutex<CacheMetrics>,
    default_ttl: Duration,
    capacity: usize,
}

impl QueryCache {
    /// Create a cache with default capacity and TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(defaults::MAX_CACHE_SIZE, defaults::QUERY_CACHE_TTL)
    }

    /// Create a cache with explicit capacity and default TTL
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_capacity_and_ttl(capacity: usize, ttl: Duration) -> Self {
        let entries = LruCache::new(NonZeroUsize::new(capacity).expect("cache capacity must be nonzero"));
        Self {
            entries: Mutex::new(entries),
            metrics: Mutex::new(CacheMetrics {
                capacity,
                ..CacheMetrics::default()
            }),
            default_ttl: ttl,
            capacity,
        }
    }

    /// Look up a cached result.
    ///
    /// Expired entries are removed on access and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<SparqlResults>> {
        let mut entries = self.entries.lock();
        let mut metrics = self.metrics.lock();

        // peek, not get: a lookup must not refresh eviction order
        let expired = match entries.peek(key) {
            None => {
                metrics.misses += 1;
                return None;
            }
            Some(entry) => Instant::now() >= entry.expires_at,
        };

        if expired {
            entries.pop(key);
            metrics.misses += 1;
            metrics.evictions += 1;
            metrics.size = entries.len();
            return None;
        }

        metrics.hits += 1;
        entries.peek(key).map(|entry| Arc::clone(&entry.value))
    }

    /// Insert a result, optionally overriding the default TTL.
    ///
    /// At capacity the entry with the oldest insertion time is evicted.
    pub fn put(&self, key: String, value: Arc<SparqlResults>, ttl: Option<Duration>) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            inserted_at: now,
            expires_at: now + ttl.unwrap_or(self.default_ttl),
        };

        let mut entries = self.entries.lock();
        let was_present = entries.contains(&key);
        let at_capacity = entries.len() == self.capacity;
        entries.put(key, entry);

        let mut metrics = self.metrics.lock();
        metrics.size = entries.len();
        if !was_present && at_capacity {
            metrics.evictions += 1;
        }
    }

    /// Remove every entry whose key matches `pattern`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` when the pattern is not a valid regex.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| Error::Parse(format!("invalid invalidation pattern: {e}")))?;

        let mut entries = self.entries.lock();
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| re.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }

        let mut metrics = self.metrics.lock();
        metrics.size = entries.len();
        metrics.invalidations += matching.len() as u64;
        Ok(matching.len())
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();

        let mut metrics = self.metrics.lock();
        metrics.size = 0;
        metrics.invalidations += count as u64;
    }

    /// Current entry count
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().clone()
    }

    /// Oldest insertion instant still cached, for diagnostics
    #[must_use]
    pub fn oldest_insert(&self) -> Option<Instant> {
        self.entries
            .lock()
            .iter()
            .map(|(_, entry)| entry.inserted_at)
            .min()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

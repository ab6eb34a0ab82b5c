//! Single-slot freshness cache for memory data
//!
//! Holds one immutable snapshot behind an `Arc`; readers take the reference
//! once and never observe in-flight mutations. Any write-through mutation
//! invalidates the slot.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::defaults;

struct Slot<T> {
    snapshot: Arc<T>,
    loaded_at: Instant,
}

/// Freshness-bounded single-slot cache
pub struct MemoryDataCache<T> {
    slot: RwLock<Option<Slot<T>>>,
    timeout: Duration,
}

impl<T> MemoryDataCache<T> {
    /// Create a cache with the default freshness timeout
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(defaults::MEMORY_CACHE_TIMEOUT)
    }

    /// Create a cache with an explicit freshness timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            timeout,
        }
    }

    /// Whether a fresh snapshot is loaded
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.slot
            .read()
            .as_ref()
            .is_some_and(|slot| slot.loaded_at.elapsed() < self.timeout)
    }

    /// The current snapshot, if still fresh
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        let guard = self.slot.read();
        let slot = guard.as_ref()?;
        if slot.loaded_at.elapsed() < self.timeout {
            Some(Arc::clone(&slot.snapshot))
        } else {
            None
        }
    }

    /// Replace the snapshot and reset its freshness clock
    pub fn store(&self, snapshot: Arc<T>) {
        *self.slot.write() = Some(Slot {
            snapshot,
            loaded_at: Instant::now(),
        });
    }

    /// Drop the snapshot; the next reader must reload
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

impl<T> Default for MemoryDataCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_is_invalid() {
        let cache: MemoryDataCache<Vec<u32>> = MemoryDataCache::new();
        assert!(!cache.is_valid());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_store_then_get_same_snapshot() {
        let cache = MemoryDataCache::new();
        let snapshot = Arc::new(vec![1, 2, 3]);
        cache.store(Arc::clone(&snapshot));

        assert!(cache.is_valid());
        assert!(Arc::ptr_eq(&cache.get().unwrap(), &snapshot));
    }

    #[test]
    fn test_invalidate_clears_slot() {
        let cache = MemoryDataCache::new();
        cache.store(Arc::new(42u32));
        cache.invalidate();
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_snapshot_expires_after_timeout() {
        let cache = MemoryDataCache::with_timeout(Duration::from_millis(10));
        cache.store(Arc::new(1u8));
        assert!(cache.is_valid());

        std::thread::sleep(Duration::from_millis(20));
        assert!(!cache.is_valid());
        assert!(cache.get().is_none());
    }
}

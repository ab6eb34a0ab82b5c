//! Process-wide cache layer
//!
//! Three cooperating pieces: the bounded query-result cache, the
//! single-slot memory-data cache, and the debounce timer that coalesces
//! write-through persistence.

pub mod memory_data;
pub mod persist;
pub mod query;

pub use memory_data::MemoryDataCache;
pub use persist::DebouncedPersister;
pub use query::{derive_key, CacheMetrics, QueryCache};

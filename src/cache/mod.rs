//! Cache Module
//!
//! Response cache keyed by request identity, with lazy TTL evaluation.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheBackend, MemoryCache};

//! # Cache Crate
//!
//! Two caches over one pluggable key-value store.
//!
//! ## Components
//!
//! ### ResultCache
//! Memoizes `MatchResult`s per unordered pair of song ids for 7 days.
//! Reads that fail are misses; writes happen in the background and their
//! failures are only logged.
//!
//! ### SourceCache
//! Read-through cache of feature records in front of a `FeatureSource`,
//! 30 days per record, expired entries evicted lazily or by `sweep`.
//!
//! ### KeyValueStore
//! The async store contract (get, set with TTL, delete, prefix listing).
//! `MemoryStore` is the bundled `DashMap` implementation.
//!
//! ## Example Usage
//!
//! ```ignore
//! use cache::{MemoryStore, ResultCache, SystemClock};
//! use matcher::ScoreEngine;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(SystemClock);
//! let store = Arc::new(MemoryStore::with_clock(clock.clone()));
//! let cache = ResultCache::new(store, Arc::new(ScoreEngine::new()), clock);
//! let result = cache.get_or_compute("a", "b", &features_a, &features_b, false).await;
//! ```

pub mod clock;
pub mod entry;
pub mod error;
pub mod memory;
pub mod result_cache;
pub mod source_cache;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::{CacheError, SourceCacheError, StoreError};
pub use memory::MemoryStore;
pub use result_cache::{DEFAULT_RESULT_TTL, RESULT_PREFIX, ResultCache, ResultCacheStats, result_key};
pub use source_cache::{
    DEFAULT_RETENTION_GRACE, DEFAULT_SOURCE_TTL, SOURCE_PREFIX, SourceCache, SourceCacheStats, source_key,
};
pub use store::KeyValueStore;

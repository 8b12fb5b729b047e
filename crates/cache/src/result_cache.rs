//! Result cache: memoizes match results per unordered pair of songs.
//!
//! ## Algorithm
//! 1. Build the key from the two ids in sorted order, so (A, B) and (B, A)
//!    share one entry
//! 2. Unless bypassed, return a live stored result
//! 3. Otherwise score synchronously with the engine, always with the lower
//!    id first, so the stored result has one fixed orientation
//! 4. Spawn the write and return immediately; a failed write is logged only
//! 5. Reorient the result when the caller asked for (hi, lo)
//!
//! Two concurrent misses for one pair may both compute and both write.
//! Scoring is deterministic, so the second write is redundant, not wrong.

use crate::clock::Clock;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::store::KeyValueStore;
use catalog::FeatureVector;
use matcher::{MatchResult, ScoreEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Key prefix owned by this cache
pub const RESULT_PREFIX: &str = "match:";

/// Default time-to-live: 7 days
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of entries inspected by [`ResultCache::stats`]
pub const DEFAULT_STATS_SAMPLE: usize = 100;

/// Approximate figures about the result cache.
///
/// Only `entries` is exact; size and age come from a bounded sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCacheStats {
    pub entries: usize,
    /// Estimated total bytes, extrapolated from the sampled entries
    pub approx_bytes: u64,
    /// Sampled key with the least time to live left
    pub oldest_key: Option<String>,
    pub sampled: usize,
}

/// Order-independent cache key for a pair of song ids.
///
/// The lower id is length-prefixed, so ids containing `:` cannot make two
/// different pairs spell the same key.
pub fn result_key(id_a: &str, id_b: &str) -> String {
    let (lo, hi) = if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) };
    format!("{}{}:{}:{}", RESULT_PREFIX, lo.len(), lo, hi)
}

/// Caches [`MatchResult`]s in a [`KeyValueStore`]
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    engine: Arc<ScoreEngine>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stats_sample: usize,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, engine: Arc<ScoreEngine>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
            ttl: DEFAULT_RESULT_TTL,
            stats_sample: DEFAULT_STATS_SAMPLE,
        }
    }

    /// Configure entry lifetime (default: 7 days)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configure how many entries stats may inspect (default: 100)
    pub fn with_stats_sample(mut self, sample: usize) -> Self {
        self.stats_sample = sample;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached result for a pair or compute and cache it.
    ///
    /// Never fails: store errors degrade to a recomputation.
    #[instrument(skip(self, features_a, features_b))]
    pub async fn get_or_compute(
        &self,
        id_a: &str,
        id_b: &str,
        features_a: &FeatureVector,
        features_b: &FeatureVector,
        bypass: bool,
    ) -> MatchResult {
        let key = result_key(id_a, id_b);
        let swapped = id_a > id_b;
        let (lo, hi) = if swapped {
            (features_b, features_a)
        } else {
            (features_a, features_b)
        };

        let stored = if bypass {
            debug!("Result cache bypassed for {}", key);
            None
        } else {
            self.read(&key).await
        };

        let canonical = match stored {
            Some(result) => {
                debug!("Result cache hit for {}", key);
                result
            }
            None => {
                if !bypass {
                    debug!("Result cache miss for {}", key);
                }
                let result = self.engine.score(lo, hi);
                self.spawn_write(key, result.clone());
                result
            }
        };

        if swapped {
            self.engine.reorient(canonical, features_a, features_b)
        } else {
            canonical
        }
    }

    /// Live cached result for a pair, without computing anything.
    ///
    /// The result is oriented with the lower of the two ids as song A,
    /// whatever order they are passed in.
    pub async fn lookup(&self, id_a: &str, id_b: &str) -> Option<MatchResult> {
        self.read(&result_key(id_a, id_b)).await
    }

    /// Drop the cached result for one pair
    pub async fn invalidate(&self, id_a: &str, id_b: &str) -> Result<bool, CacheError> {
        let key = result_key(id_a, id_b);
        let removed = self.store.delete(&key).await?;
        debug!("Invalidated {} (existed: {})", key, removed);
        Ok(removed)
    }

    /// Drop every cached result
    pub async fn clear_all(&self) -> Result<usize, CacheError> {
        let keys = self.store.keys_by_prefix(RESULT_PREFIX).await?;
        let removed = self.store.delete_many(&keys).await?;
        warn!("Cleared the entire result cache ({} entries)", removed);
        Ok(removed)
    }

    /// Entry count plus size and age estimates from a bounded sample
    pub async fn stats(&self) -> Result<ResultCacheStats, CacheError> {
        let keys = self.store.keys_by_prefix(RESULT_PREFIX).await?;
        let sample = &keys[..keys.len().min(self.stats_sample)];

        let mut sampled_bytes: u64 = 0;
        let mut sized = 0usize;
        let mut oldest: Option<(Duration, &String)> = None;

        for key in sample {
            if let Some(bytes) = self.store.get(key).await? {
                sampled_bytes += bytes.len() as u64;
                sized += 1;
            }
            if let Some(remaining) = self.store.ttl_remaining(key).await? {
                if oldest.is_none_or(|(least, _)| remaining < least) {
                    oldest = Some((remaining, key));
                }
            }
        }

        let approx_bytes = if sized == 0 {
            0
        } else {
            sampled_bytes * keys.len() as u64 / sized as u64
        };

        Ok(ResultCacheStats {
            entries: keys.len(),
            approx_bytes,
            oldest_key: oldest.map(|(_, key)| key.clone()),
            sampled: sample.len(),
        })
    }

    /// Read and decode one entry, treating every failure as a miss
    async fn read(&self, key: &str) -> Option<MatchResult> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Result cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let entry = match CacheEntry::<MatchResult>::decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable result entry {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!("Result entry {} expired at {}", key, entry.expires_at);
            if let Err(e) = self.store.delete(key).await {
                warn!("Failed to evict expired result {}: {}", key, e);
            }
            return None;
        }

        Some(entry.value)
    }

    /// Persist a result in the background
    fn spawn_write(&self, key: String, result: MatchResult) {
        let entry = CacheEntry::new(key, result, self.clock.now(), self.ttl);
        let bytes = match entry.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode result for {}: {}", entry.key, e);
                return;
            }
        };

        let key = entry.key;
        let store = self.store.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            match store.set_with_ttl(&key, bytes, ttl).await {
                Ok(()) => debug!("Cached result {}", key),
                Err(e) => warn!("Failed to cache result {}: {}", key, e),
            }
        });
    }
}

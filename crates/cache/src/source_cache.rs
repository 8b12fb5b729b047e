//! Source cache: keeps feature records fetched from a FeatureSource.
//!
//! ## Algorithm
//! 1. Look up `(platform, id)`; a live entry is a hit
//! 2. An expired entry is deleted, then handled as a miss
//! 3. On a miss, fetch from the source, validate, store for 30 days, return
//!
//! Upstream failures reach the caller unchanged. Store failures never do.
//!
//! Entries are written with a store TTL longer than their own lifetime
//! (by the retention grace) so expired records stay visible to
//! [`SourceCache::sweep`] and [`SourceCache::stats`] until swept.

use crate::clock::Clock;
use crate::entry::CacheEntry;
use crate::error::{CacheError, SourceCacheError};
use crate::store::KeyValueStore;
use catalog::{FeatureVector, Platform, TrackRecord};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use sources::FeatureSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Key prefix owned by this cache
pub const SOURCE_PREFIX: &str = "track:";

/// Default time-to-live: 30 days
pub const DEFAULT_SOURCE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default extra store lifetime of an expired entry: 1 day
pub const DEFAULT_RETENTION_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

/// Exact counts over the source cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCacheStats {
    pub total: usize,
    pub expired: usize,
}

pub fn source_key(platform: Platform, id: &str) -> String {
    format!("{}{}:{}", SOURCE_PREFIX, platform, id)
}

/// Read-through cache in front of a [`FeatureSource`]
#[derive(Clone)]
pub struct SourceCache {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn FeatureSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    retention_grace: Duration,
}

impl SourceCache {
    pub fn new(store: Arc<dyn KeyValueStore>, source: Arc<dyn FeatureSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            source,
            clock,
            ttl: DEFAULT_SOURCE_TTL,
            retention_grace: DEFAULT_RETENTION_GRACE,
        }
    }

    /// Configure entry lifetime (default: 30 days)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configure how long expired entries stay in the store (default: 1 day)
    pub fn with_retention_grace(mut self, grace: Duration) -> Self {
        self.retention_grace = grace;
        self
    }

    /// Feature vector of a track, from cache or from the source
    pub async fn get_features(&self, platform: Platform, id: &str) -> Result<FeatureVector, SourceCacheError> {
        Ok(self.get_record(platform, id).await?.features)
    }

    /// Full record of a track, from cache or from the source
    #[instrument(skip(self))]
    pub async fn get_record(&self, platform: Platform, id: &str) -> Result<TrackRecord, SourceCacheError> {
        let key = source_key(platform, id);

        if let Some(record) = self.read(&key).await {
            debug!("Source cache hit for {}", key);
            return Ok(record);
        }
        debug!("Source cache miss for {}, asking {}", key, self.source.name());

        let record = self.source.fetch_by_id(platform, id).await?;
        record.features.validate()?;
        self.write(&record).await;
        Ok(record)
    }

    /// Resolve several tracks concurrently; the first failure wins
    pub async fn get_many(&self, ids: &[(Platform, String)]) -> Result<Vec<TrackRecord>, SourceCacheError> {
        try_join_all(ids.iter().map(|(platform, id)| self.get_record(*platform, id))).await
    }

    /// Search the source directly and refresh every valid hit in the cache.
    ///
    /// Search results themselves are not cached.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TrackRecord>, SourceCacheError> {
        let hits = self.source.search(query, limit, offset).await?;

        let valid: Vec<TrackRecord> = hits
            .into_iter()
            .filter(|record| match record.features.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping invalid search hit {}:{}: {}", record.platform, record.id, e);
                    false
                }
            })
            .collect();

        join_all(valid.iter().map(|record| self.write(record))).await;
        debug!("Search {:?} refreshed {} records", query, valid.len());
        Ok(valid)
    }

    /// Drop one cached record
    pub async fn invalidate(&self, platform: Platform, id: &str) -> Result<bool, CacheError> {
        Ok(self.store.delete(&source_key(platform, id)).await?)
    }

    /// Delete every entry past its expiry. Meant to be run on a schedule.
    pub async fn sweep(&self) -> Result<usize, CacheError> {
        let expired = self.expired_keys().await?.1;
        let removed = if expired.is_empty() {
            0
        } else {
            self.store.delete_many(&expired).await?
        };
        info!("Source cache sweep removed {} expired entries", removed);
        Ok(removed)
    }

    /// Exact total and expired entry counts
    pub async fn stats(&self) -> Result<SourceCacheStats, CacheError> {
        let (total, expired) = self.expired_keys().await?;
        Ok(SourceCacheStats {
            total,
            expired: expired.len(),
        })
    }

    /// Total key count and the keys whose entries have expired
    async fn expired_keys(&self) -> Result<(usize, Vec<String>), CacheError> {
        let keys = self.store.keys_by_prefix(SOURCE_PREFIX).await?;
        let now = self.clock.now();
        let mut expired = Vec::new();
        let mut total = 0;

        for key in keys {
            let Some(bytes) = self.store.get(&key).await? else {
                continue;
            };
            total += 1;
            match CacheEntry::<TrackRecord>::decode(&bytes) {
                Ok(entry) if entry.is_expired(now) => expired.push(key),
                Ok(_) => {}
                Err(e) => {
                    warn!("Treating undecodable source entry {} as expired: {}", key, e);
                    expired.push(key);
                }
            }
        }

        Ok((total, expired))
    }

    async fn read(&self, key: &str) -> Option<TrackRecord> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Source cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let entry = match CacheEntry::<TrackRecord>::decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable source entry {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!("Source entry {} expired at {}", key, entry.expires_at);
            if let Err(e) = self.store.delete(key).await {
                warn!("Failed to evict expired source entry {}: {}", key, e);
            }
            return None;
        }

        Some(entry.value)
    }

    /// Store a record, logging and swallowing any failure
    async fn write(&self, record: &TrackRecord) {
        let key = source_key(record.platform, &record.id);
        let entry = CacheEntry::new(key.as_str(), record, self.clock.now(), self.ttl);

        let result = match entry.encode() {
            Ok(bytes) => self
                .store
                .set_with_ttl(&key, bytes, self.ttl + self.retention_grace)
                .await
                .map_err(CacheError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Failed to cache source record {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key() {
        assert_eq!(source_key(Platform::Spotify, "abc"), "track:spotify:abc");
        assert_eq!(source_key(Platform::AppleMusic, "1"), "track:apple_music:1");
    }

    #[test]
    fn test_default_ttl_is_thirty_days() {
        assert_eq!(DEFAULT_SOURCE_TTL.as_secs(), 2_592_000);
    }
}

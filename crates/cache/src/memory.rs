//! In-memory key-value store.
//!
//! Uses `DashMap` so concurrent readers on the scoring path don't contend.
//! Expiry is lazy: an expired key is removed the next time it is read and
//! is invisible to listings in the meantime.

use crate::clock::{Clock, SystemClock, expiry_after};
use crate::error::StoreError;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Thread-safe store keeping everything in process memory
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored keys, including expired ones not yet evicted
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    fn is_live(&self, value: &StoredValue, now: DateTime<Utc>) -> bool {
        value.expires_at > now
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = self.clock.now();
        if let Some(value) = self.entries.get(key) {
            if self.is_live(&value, now) {
                return Ok(Some(value.bytes.clone()));
            }
        }
        // Either absent or expired; the guard above is dropped by now
        self.entries.remove_if(key, |_, v| v.expires_at <= now);
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expiry_after(self.clock.now(), ttl);
        self.entries.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, StoreError> {
        Ok(keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count())
    }

    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && self.is_live(entry.value(), now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|value| self.is_live(value, now))
            .and_then(|value| (value.expires_at - now).to_std().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryStore::with_clock(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let (_, store) = store();
        store.set_with_ttl("a", b"1".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let (clock, store) = store();
        store.set_with_ttl("a", b"1".to_vec(), Duration::from_secs(60)).await.unwrap();
        clock.advance(Duration::from_secs(61));

        assert_eq!(store.raw_len(), 1);
        assert!(store.keys_by_prefix("").await.unwrap().is_empty());
        assert_eq!(store.ttl_remaining("a").await.unwrap(), None);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.raw_len(), 0);
    }

    #[tokio::test]
    async fn test_prefix_listing_and_bulk_delete() {
        let (_, store) = store();
        let ttl = Duration::from_secs(60);
        for key in ["match:a:b", "match:a:c", "track:spotify:1"] {
            store.set_with_ttl(key, vec![0], ttl).await.unwrap();
        }

        let keys = store.keys_by_prefix("match:").await.unwrap();
        assert_eq!(keys, vec!["match:a:b".to_string(), "match:a:c".to_string()]);

        let removed = store
            .delete_many(&["match:a:b".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.keys_by_prefix("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ttl_remaining_counts_down() {
        let (clock, store) = store();
        store.set_with_ttl("a", vec![], Duration::from_secs(100)).await.unwrap();
        clock.advance(Duration::from_secs(40));
        assert_eq!(store.ttl_remaining("a").await.unwrap(), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let (_, store) = store();
        let ttl = Duration::from_secs(60);
        store.set_with_ttl("k", b"old".to_vec(), ttl).await.unwrap();
        store.set_with_ttl("k", b"new".to_vec(), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));
    }
}

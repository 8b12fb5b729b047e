//! Key-value store abstraction shared by both caches.
//!
//! Each cache owns a key prefix inside one store. Values are opaque bytes;
//! the caches decide how to encode them.

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// Minimal store contract: byte values, per-key TTL, prefix listing.
///
/// Implementations must tolerate concurrent use; last write wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a live value, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a value that the store drops after `ttl`
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Delete one key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete several keys, returning how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<usize, StoreError>;

    /// All live keys starting with `prefix`
    async fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Time left before the store drops `key`, `None` if absent
    async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}

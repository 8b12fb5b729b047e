//! Error types for the caching layer.
//!
//! Two very different families live here:
//! - [`StoreError`] / [`CacheError`]: the store or the codec failed. On the
//!   scoring and lookup paths these are logged and swallowed; a cache
//!   outage costs performance, never correctness.
//! - [`SourceCacheError`]: the record itself could not be produced. These
//!   always reach the caller.

use catalog::CatalogError;
use sources::UpstreamError;
use thiserror::Error;

/// Failure reported by a key-value store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation {operation} failed: {reason}")]
    Operation { operation: &'static str, reason: String },
}

/// Any failure while reading or writing a cache entry
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode or decode cache entry: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Why the source cache could not return a track
#[derive(Debug, Error)]
pub enum SourceCacheError {
    /// The feature source failed; passed through unchanged
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The source returned a record that failed validation
    #[error("Invalid record from feature source: {0}")]
    Invalid(#[from] CatalogError),
}

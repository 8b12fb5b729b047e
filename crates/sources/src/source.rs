//! The FeatureSource boundary.
//!
//! A feature source is whatever external system knows the audio features
//! of a track: a streaming platform API, a local analysis database, or the
//! bundled catalog. The caches only ever talk to this trait.

use async_trait::async_trait;
use catalog::{Platform, TrackRecord};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a feature source.
///
/// These are passed to callers unchanged: without a record there is no
/// feature vector to score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("Track {platform}:{id} not found")]
    NotFound { platform: Platform, id: String },

    #[error("Rate limited by {source_name}")]
    RateLimited {
        source_name: String,
        retry_after: Option<Duration>,
    },

    #[error("Request to {source_name} timed out after {elapsed:?}")]
    Timeout {
        source_name: String,
        elapsed: Duration,
    },

    #[error("Feature source unavailable: {0}")]
    Unavailable(String),
}

/// External provider of track feature records.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Source identifier for logging (e.g., "catalog", "spotify")
    fn name(&self) -> &str;

    /// Fetch one record by platform and id
    async fn fetch_by_id(&self, platform: Platform, id: &str) -> Result<TrackRecord, UpstreamError>;

    /// Free-text search over the source's tracks
    ///
    /// # Arguments
    /// * `query` - Title or artist text
    /// * `limit` - Maximum records to return
    /// * `offset` - Records to skip, for paging
    async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TrackRecord>, UpstreamError>;
}

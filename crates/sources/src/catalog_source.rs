//! Catalog Source - feature records served from a loaded TrackCatalog
//!
//! Stands in for a remote platform API: lookups and searches are answered
//! from an in-memory catalog shared behind an `Arc`.

use crate::source::{FeatureSource, UpstreamError};
use async_trait::async_trait;
use catalog::{Platform, TrackCatalog, TrackRecord};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Feature source backed by a [`TrackCatalog`]
#[derive(Clone)]
pub struct CatalogSource {
    /// Shared reference to the catalog (read-only, so no Mutex needed)
    catalog: Arc<TrackCatalog>,

    /// Upper bound on search page size
    max_page_size: usize,
}

impl CatalogSource {
    pub fn new(catalog: Arc<TrackCatalog>) -> Self {
        Self {
            catalog,
            max_page_size: 50,
        }
    }

    /// Configure the largest page a search may return (default: 50)
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max;
        self
    }

    pub fn catalog(&self) -> &Arc<TrackCatalog> {
        &self.catalog
    }
}

#[async_trait]
impl FeatureSource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, platform: Platform, id: &str) -> Result<TrackRecord, UpstreamError> {
        let record = self
            .catalog
            .get(platform, id)
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound {
                platform,
                id: id.to_string(),
            })?;
        debug!("Fetched {}", record.display_name());
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TrackRecord>, UpstreamError> {
        let limit = limit.min(self.max_page_size);
        let hits: Vec<TrackRecord> = self
            .catalog
            .search(query, limit, offset)
            .into_iter()
            .cloned()
            .collect();
        debug!("Search {:?} returned {} records", query, hits.len());
        Ok(hits)
    }
}

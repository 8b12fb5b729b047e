//! # Match Orchestrator
//!
//! Composition root wiring the engine, both caches and a feature source.
//!
//! A comparison request flows as:
//! 1. Resolve both tracks through the SourceCache (concurrently)
//! 2. Score the pair through the ResultCache
//! 3. Return the records together with the result
//!
//! Similar-track queries search the source, then rank every hit against
//! the seed on the blocking pool.
//!
//! Expired source entries are removed by a background sweeper bound to the
//! orchestrator's own store; see [`MatchOrchestrator::spawn_sweeper`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use cache::{
    Clock, KeyValueStore, MemoryStore, ResultCache, ResultCacheStats, SourceCache, SourceCacheStats, SystemClock,
};
use catalog::{FeatureVector, Platform, TrackCatalog, TrackRecord};
use matcher::{MatchResult, RankedMatch, ScoreEngine};
use sources::{CatalogSource, FeatureSource};

use crate::config::MatchConfig;

/// Two resolved tracks and their score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMatch {
    pub track_a: TrackRecord,
    pub track_b: TrackRecord,
    pub result: MatchResult,
}

/// Figures from both caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub results: ResultCacheStats,
    pub sources: SourceCacheStats,
}

/// Result-cache identity of a track; ids are only unique per platform
fn cache_id(platform: Platform, id: &str) -> String {
    format!("{}:{}", platform, id)
}

#[derive(Clone)]
pub struct MatchOrchestrator {
    engine: Arc<ScoreEngine>,
    results: ResultCache,
    sources: SourceCache,
}

impl MatchOrchestrator {
    /// Wire every component from explicit parts
    pub fn new(
        config: &MatchConfig,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn FeatureSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = Arc::new(ScoreEngine::new().with_algorithm_version(config.algorithm_version.clone()));

        let results = ResultCache::new(store.clone(), engine.clone(), clock.clone())
            .with_ttl(config.result_ttl())
            .with_stats_sample(config.stats_sample_size);

        let sources = SourceCache::new(store, source, clock)
            .with_ttl(config.source_ttl())
            .with_retention_grace(config.source_retention_grace());

        Self {
            engine,
            results,
            sources,
        }
    }

    /// Load the configured record file and serve it from an in-memory store
    pub fn from_catalog(config: &MatchConfig) -> Result<Self> {
        let start = Instant::now();
        let catalog = TrackCatalog::load_from_file(&config.catalog_path)
            .with_context(|| format!("Failed to load catalog from {}", config.catalog_path.display()))?;
        info!("Loaded {} tracks in {:.2?}", catalog.len(), start.elapsed());

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let source = Arc::new(CatalogSource::new(Arc::new(catalog)));
        Ok(Self::new(config, store, source, clock))
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    pub fn result_cache(&self) -> &ResultCache {
        &self.results
    }

    pub fn source_cache(&self) -> &SourceCache {
        &self.sources
    }

    /// Score two vectors directly, bypassing every cache
    pub fn score(&self, a: &FeatureVector, b: &FeatureVector) -> MatchResult {
        self.engine.score(a, b)
    }

    /// Score two vectors through the result cache
    pub async fn score_cached(
        &self,
        id_a: &str,
        id_b: &str,
        features_a: &FeatureVector,
        features_b: &FeatureVector,
        bypass: bool,
    ) -> MatchResult {
        self.results
            .get_or_compute(id_a, id_b, features_a, features_b, bypass)
            .await
    }

    /// Resolve two tracks of one platform and score them
    #[instrument(skip(self))]
    pub async fn match_tracks(&self, platform: Platform, id_a: &str, id_b: &str, bypass: bool) -> Result<TrackMatch> {
        let start = Instant::now();

        let (track_a, track_b) = tokio::try_join!(
            self.sources.get_record(platform, id_a),
            self.sources.get_record(platform, id_b),
        )
        .context("Failed to resolve tracks")?;

        let result = self
            .score_cached(
                &cache_id(platform, id_a),
                &cache_id(platform, id_b),
                &track_a.features,
                &track_b.features,
                bypass,
            )
            .await;

        info!(
            "Matched {} vs {}: {} in {:.2?}",
            track_a.display_name(),
            track_b.display_name(),
            result.overall_score,
            start.elapsed()
        );

        Ok(TrackMatch {
            track_a,
            track_b,
            result,
        })
    }

    /// Search the source and rank the hits against a seed track.
    ///
    /// The seed itself is never part of the answer.
    #[instrument(skip(self))]
    pub async fn similar_tracks(
        &self,
        platform: Platform,
        id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedMatch>> {
        let seed = self
            .sources
            .get_record(platform, id)
            .await
            .context("Failed to resolve seed track")?;

        let candidates: Vec<TrackRecord> = self
            .sources
            .search(query, limit.saturating_add(1), 0)
            .await
            .context("Search failed")?
            .into_iter()
            .filter(|record| !(record.platform == seed.platform && record.id == seed.id))
            .collect();
        info!("Ranking {} candidates against {}", candidates.len(), seed.display_name());

        // Scoring is CPU-bound; keep it off the async workers
        let engine = self.engine.clone();
        let ranked = tokio::task::spawn_blocking(move || engine.rank(&seed.features, &candidates, limit))
            .await
            .context("Ranking task panicked")?;

        Ok(ranked)
    }

    /// Stats of both caches, gathered concurrently
    pub async fn stats(&self) -> Result<CacheStats> {
        let (results, sources) = tokio::try_join!(
            async { self.results.stats().await.context("Result cache stats failed") },
            async { self.sources.stats().await.context("Source cache stats failed") },
        )?;
        Ok(CacheStats { results, sources })
    }

    /// Remove expired source entries
    pub async fn sweep(&self) -> Result<usize> {
        self.sources.sweep().await.context("Source cache sweep failed")
    }

    /// Drop every cached match result
    pub async fn clear_results(&self) -> Result<usize> {
        self.results.clear_all().await.context("Failed to clear result cache")
    }

    /// Sweep this orchestrator's source cache every `interval` until the
    /// returned task is aborted or the runtime shuts down.
    ///
    /// The first sweep runs immediately. Failures are logged and the loop
    /// keeps going.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let orchestrator = self.clone();
        info!("Sweeping expired source entries every {:?}", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match orchestrator.sweep().await {
                    Ok(0) => debug!("Sweep found nothing to remove"),
                    Ok(removed) => info!("Sweep removed {} expired entries", removed),
                    Err(e) => error!("Sweep failed: {:#}", e),
                }
                match orchestrator.stats().await {
                    Ok(stats) => debug!(
                        "Cache: {} results (~{} bytes), {} source entries ({} expired)",
                        stats.results.entries,
                        stats.results.approx_bytes,
                        stats.sources.total,
                        stats.sources.expired
                    ),
                    Err(e) => warn!("Cache stats unavailable after sweep: {:#}", e),
                }
            }
        })
    }
}

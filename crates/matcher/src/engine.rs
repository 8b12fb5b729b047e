//! Score engine: combines the layers into a 0-100 match score.
//!
//! ## Algorithm
//! 1. Evaluate the three layers (audio 60%, musical 25%, metadata 15%)
//! 2. `overall = round(100 × Σ layer_score × layer_weight)`
//! 3. Confidence = available signals / tracked signals
//! 4. Generate the explanation from the same intermediate scores
//!
//! The engine holds no mutable state and can be shared freely.

use crate::aggregator::LayerAggregator;
use crate::explanation::ExplanationGenerator;
use crate::types::{ALGORITHM_VERSION, MatchResult};
use catalog::{FeatureVector, Platform, TrackId, TrackRecord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

/// Signals every feature vector carries
const MANDATORY_SIGNALS: usize = 9;
/// Optional metadata signals: genres, artist, release year
const OPTIONAL_SIGNALS: usize = 3;

/// One candidate scored against a seed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub platform: Platform,
    pub id: TrackId,
    pub title: String,
    pub result: MatchResult,
}

/// Computes [`MatchResult`]s for pairs of feature vectors.
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    aggregator: LayerAggregator,
    explainer: ExplanationGenerator,
    algorithm_version: String,
}

impl ScoreEngine {
    pub fn new() -> Self {
        Self {
            aggregator: LayerAggregator::new(),
            explainer: ExplanationGenerator::new(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }

    /// Override the version tag stamped on results (default: [`ALGORITHM_VERSION`])
    pub fn with_algorithm_version(mut self, version: impl Into<String>) -> Self {
        self.algorithm_version = version.into();
        self
    }

    pub fn algorithm_version(&self) -> &str {
        &self.algorithm_version
    }

    /// Score two songs. Inputs are not validated.
    pub fn score(&self, a: &FeatureVector, b: &FeatureVector) -> MatchResult {
        let start = Instant::now();

        let breakdown = self.aggregator.aggregate(a, b);
        let combined = self.aggregator.combine(&breakdown);
        let overall_score = (combined * 100.0).round().clamp(0.0, 100.0) as u8;
        let confidence = confidence(a, b);
        let explanation = self.explainer.generate(a, b, &breakdown, overall_score);

        let processing_time = start.elapsed();
        debug!(
            "Scored pair: overall={} confidence={:.2} in {:?}",
            overall_score, confidence, processing_time
        );

        MatchResult {
            overall_score,
            confidence,
            breakdown,
            explanation,
            processing_time,
            algorithm_version: self.algorithm_version.clone(),
        }
    }

    /// Turn a result computed for `(b, a)` into the result for `(a, b)`.
    ///
    /// Scores and similarities carry over; raw values are swapped and the
    /// explanation is rebuilt so it describes `a` first.
    pub fn reorient(&self, result: MatchResult, a: &FeatureVector, b: &FeatureVector) -> MatchResult {
        let breakdown = result.breakdown.swapped();
        let explanation = self.explainer.generate(a, b, &breakdown, result.overall_score);
        MatchResult {
            breakdown,
            explanation,
            ..result
        }
    }

    /// Score a seed against many candidates in parallel and keep the best.
    ///
    /// Sorted by overall score descending, then confidence descending, then
    /// by `(platform, id)` so the order is stable.
    pub fn rank(
        &self,
        seed: &FeatureVector,
        candidates: &[TrackRecord],
        limit: usize,
    ) -> Vec<RankedMatch> {
        let mut ranked: Vec<RankedMatch> = candidates
            .par_iter()
            .map(|candidate| RankedMatch {
                platform: candidate.platform,
                id: candidate.id.clone(),
                title: candidate.title.clone(),
                result: self.score(seed, &candidate.features),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.result
                .overall_score
                .cmp(&a.result.overall_score)
                .then_with(|| {
                    b.result
                        .confidence
                        .partial_cmp(&a.result.confidence)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| (a.platform, &a.id).cmp(&(b.platform, &b.id)))
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of tracked signals present on both sides.
///
/// Mandatory fields always count; each optional field counts only when
/// both songs have it. Ranges from 9/12 to 1.0.
pub fn confidence(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let optional_present = [
        !a.genres.is_empty() && !b.genres.is_empty(),
        a.artist.is_some() && b.artist.is_some(),
        a.release_year.is_some() && b.release_year.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();

    (MANDATORY_SIGNALS + optional_present) as f64 / (MANDATORY_SIGNALS + OPTIONAL_SIGNALS) as f64
}

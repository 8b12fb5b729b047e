//! Core trait for scoring layers.
//!
//! A layer groups a fixed set of features, each with a fixed weight, and
//! reduces them to one normalized score.

use crate::types::{LayerResult, ScoreComponent};
use catalog::FeatureVector;
use std::collections::BTreeMap;

/// One weighted group of feature comparisons.
///
/// ## Design Note
/// - `Send + Sync` so the engine can be shared across threads
/// - The sub-weights returned by `compare` must sum to `total_weight`
pub trait Layer: Send + Sync {
    /// Name of this layer (for logging/debugging)
    fn name(&self) -> &str;

    /// Share of the overall score this layer carries
    fn total_weight(&self) -> f64;

    /// Compare every feature of this layer
    fn compare(&self, a: &FeatureVector, b: &FeatureVector) -> Vec<(&'static str, ScoreComponent)>;

    /// Compare and normalize: `Σ similarity × weight / total_weight`
    fn evaluate(&self, a: &FeatureVector, b: &FeatureVector) -> LayerResult {
        let components: BTreeMap<String, ScoreComponent> = self
            .compare(a, b)
            .into_iter()
            .map(|(name, component)| (name.to_string(), component))
            .collect();

        let weighted: f64 = components.values().map(ScoreComponent::contribution).sum();
        let score = (weighted / self.total_weight()).clamp(0.0, 1.0);

        LayerResult { score, components }
    }
}

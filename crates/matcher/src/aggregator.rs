//! The LayerAggregator runs the three fixed layers.
//!
//! Mirrors a pipeline: each layer is evaluated in order, logged, and the
//! results are collected into a [`Breakdown`].

use crate::layers::{AudioLayer, MetadataLayer, MusicalLayer};
use crate::traits::Layer;
use crate::types::{Breakdown, LayerResult};
use catalog::FeatureVector;
use tracing::debug;

/// Evaluates the audio, musical and metadata layers.
#[derive(Debug, Clone, Default)]
pub struct LayerAggregator {
    audio: AudioLayer,
    musical: MusicalLayer,
    metadata: MetadataLayer,
}

impl LayerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate all three layers for a pair of songs.
    pub fn aggregate(&self, a: &FeatureVector, b: &FeatureVector) -> Breakdown {
        Breakdown {
            layer1: run(&self.audio, a, b),
            layer2: run(&self.musical, a, b),
            layer3: run(&self.metadata, a, b),
        }
    }

    /// Weighted combination of the layer scores, in `[0, 1]`.
    pub fn combine(&self, breakdown: &Breakdown) -> f64 {
        let combined = breakdown.layer1.score * self.audio.total_weight()
            + breakdown.layer2.score * self.musical.total_weight()
            + breakdown.layer3.score * self.metadata.total_weight();
        combined.clamp(0.0, 1.0)
    }
}

fn run(layer: &dyn Layer, a: &FeatureVector, b: &FeatureVector) -> LayerResult {
    let result = layer.evaluate(a, b);
    debug!(
        "Layer {} scored {:.3} over {} components",
        layer.name(),
        result.score,
        result.components.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Mode;

    fn vector(valence: f64, key: u8) -> FeatureVector {
        FeatureVector {
            valence,
            energy: 0.6,
            danceability: 0.7,
            tempo: 95.0,
            acousticness: 0.1,
            key,
            mode: Mode::Major,
            time_signature: 4,
            loudness: -7.0,
            duration_ms: 190_000,
            genres: vec!["soul".to_string()],
            artist: Some("Aretha Franklin".to_string()),
            release_year: Some(1967),
        }
    }

    #[test]
    fn test_breakdown_has_every_component() {
        let breakdown = LayerAggregator::new().aggregate(&vector(0.5, 0), &vector(0.6, 7));
        assert_eq!(breakdown.layer1.components.len(), 5);
        assert_eq!(breakdown.layer2.components.len(), 4);
        assert_eq!(breakdown.layer3.components.len(), 3);
        assert!(breakdown.similarity("tempo").is_some());
        assert!(breakdown.similarity("era").is_some());
        assert!(breakdown.similarity("bpm").is_none());
    }

    #[test]
    fn test_layer_scores_are_normalized() {
        let aggregator = LayerAggregator::new();
        let breakdown = aggregator.aggregate(&vector(0.0, 0), &vector(1.0, 6));
        for layer in [&breakdown.layer1, &breakdown.layer2, &breakdown.layer3] {
            assert!((0.0..=1.0).contains(&layer.score));
        }
        // valence is the only audio difference: (1 - 0.15) / 0.60 of the way
        let expected = (0.60 - 0.15) / 0.60;
        assert!((breakdown.layer1.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_combine_identical_is_one() {
        let aggregator = LayerAggregator::new();
        let v = vector(0.5, 3);
        let breakdown = aggregator.aggregate(&v, &v);
        assert!((aggregator.combine(&breakdown) - 1.0).abs() < 1e-9);
    }
}

//! Layer 2: musical structure.

use crate::similarity::{
    duration_similarity, fifths_distance, key_similarity, loudness_similarity,
    time_signature_similarity,
};
use crate::traits::Layer;
use crate::types::{FeatureValue, ScoreComponent};
use catalog::FeatureVector;

pub const WEIGHT_KEY: f64 = 0.10;
pub const WEIGHT_TIME_SIGNATURE: f64 = 0.05;
pub const WEIGHT_LOUDNESS: f64 = 0.05;
pub const WEIGHT_DURATION: f64 = 0.05;

/// Compares harmony, meter, loudness and length. Carries 25% of the overall score.
#[derive(Debug, Clone, Copy, Default)]
pub struct MusicalLayer;

impl Layer for MusicalLayer {
    fn name(&self) -> &str {
        "musical"
    }

    fn total_weight(&self) -> f64 {
        0.25
    }

    fn compare(&self, a: &FeatureVector, b: &FeatureVector) -> Vec<(&'static str, ScoreComponent)> {
        let key = ScoreComponent::new(
            key_similarity(a.key, a.mode, b.key, b.mode),
            WEIGHT_KEY,
            FeatureValue::Text(a.key_name()),
            FeatureValue::Text(b.key_name()),
        )
        .with_label(format!("{} steps on the circle of fifths", fifths_distance(a.key, b.key)));

        vec![
            ("key", key),
            (
                "time_signature",
                ScoreComponent::new(
                    time_signature_similarity(a.time_signature, b.time_signature),
                    WEIGHT_TIME_SIGNATURE,
                    a.time_signature as f64,
                    b.time_signature as f64,
                ),
            ),
            (
                "loudness",
                ScoreComponent::new(
                    loudness_similarity(a.loudness, b.loudness),
                    WEIGHT_LOUDNESS,
                    a.loudness,
                    b.loudness,
                ),
            ),
            (
                "duration",
                ScoreComponent::new(
                    duration_similarity(a.duration_ms, b.duration_ms),
                    WEIGHT_DURATION,
                    a.duration_ms as f64,
                    b.duration_ms as f64,
                ),
            ),
        ]
    }
}

//! Layer 1: perceptual audio descriptors.

use crate::similarity::{continuous_similarity, is_octave_related, tempo_similarity};
use crate::traits::Layer;
use crate::types::ScoreComponent;
use catalog::FeatureVector;

pub const WEIGHT_VALENCE: f64 = 0.15;
pub const WEIGHT_ENERGY: f64 = 0.15;
pub const WEIGHT_DANCEABILITY: f64 = 0.12;
pub const WEIGHT_TEMPO: f64 = 0.10;
pub const WEIGHT_ACOUSTICNESS: f64 = 0.08;

/// Compares mood, intensity and groove. Carries 60% of the overall score.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioLayer;

impl Layer for AudioLayer {
    fn name(&self) -> &str {
        "audio"
    }

    fn total_weight(&self) -> f64 {
        0.60
    }

    fn compare(&self, a: &FeatureVector, b: &FeatureVector) -> Vec<(&'static str, ScoreComponent)> {
        let mut tempo = ScoreComponent::new(
            tempo_similarity(a.tempo, b.tempo),
            WEIGHT_TEMPO,
            a.tempo,
            b.tempo,
        );
        if is_octave_related(a.tempo, b.tempo) {
            tempo = tempo.with_label("half/double time");
        }

        vec![
            (
                "valence",
                ScoreComponent::new(
                    continuous_similarity(a.valence, b.valence),
                    WEIGHT_VALENCE,
                    a.valence,
                    b.valence,
                ),
            ),
            (
                "energy",
                ScoreComponent::new(
                    continuous_similarity(a.energy, b.energy),
                    WEIGHT_ENERGY,
                    a.energy,
                    b.energy,
                ),
            ),
            (
                "danceability",
                ScoreComponent::new(
                    continuous_similarity(a.danceability, b.danceability),
                    WEIGHT_DANCEABILITY,
                    a.danceability,
                    b.danceability,
                ),
            ),
            ("tempo", tempo),
            (
                "acousticness",
                ScoreComponent::new(
                    continuous_similarity(a.acousticness, b.acousticness),
                    WEIGHT_ACOUSTICNESS,
                    a.acousticness,
                    b.acousticness,
                ),
            ),
        ]
    }
}

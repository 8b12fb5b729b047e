//! Layer implementations.
//!
//! The three layers and their weights are fixed:
//!
//! | layer | total | features |
//! |---|---|---|
//! | audio | 0.60 | valence 0.15, energy 0.15, danceability 0.12, tempo 0.10, acousticness 0.08 |
//! | musical | 0.25 | key 0.10, time signature 0.05, loudness 0.05, duration 0.05 |
//! | metadata | 0.15 | genre 0.08, artist 0.04, era 0.03 |

pub mod audio;
pub mod metadata;
pub mod musical;

pub use audio::AudioLayer;
pub use metadata::MetadataLayer;
pub use musical::MusicalLayer;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Layer;
    use catalog::{FeatureVector, Mode};

    fn vector() -> FeatureVector {
        FeatureVector {
            valence: 0.4,
            energy: 0.9,
            danceability: 0.6,
            tempo: 128.0,
            acousticness: 0.05,
            key: 5,
            mode: Mode::Minor,
            time_signature: 4,
            loudness: -6.0,
            duration_ms: 240_000,
            genres: vec!["techno".to_string()],
            artist: Some("Kraftwerk".to_string()),
            release_year: Some(1981),
        }
    }

    #[test]
    fn test_sub_weights_sum_to_layer_total() {
        let v = vector();
        let layers: [&dyn Layer; 3] = [&AudioLayer, &MusicalLayer, &MetadataLayer];
        for layer in layers {
            let sum: f64 = layer.compare(&v, &v).iter().map(|(_, c)| c.weight).sum();
            assert!(
                (sum - layer.total_weight()).abs() < 1e-9,
                "{} weights sum to {} not {}",
                layer.name(),
                sum,
                layer.total_weight()
            );
        }
    }

    #[test]
    fn test_layer_totals_sum_to_one() {
        let total = AudioLayer.total_weight() + MusicalLayer.total_weight() + MetadataLayer.total_weight();
        assert!((total - 1.0).abs() < 1e-9);
    }
}

//! Layer 3: descriptive metadata.
//!
//! Genre, artist and release year are optional. A side without the data
//! scores neutral (0.5) rather than dissimilar, except when a vector is
//! compared with an identical copy of itself: identical unknowns count as
//! a match so self-comparison always scores 1.0.

use crate::similarity::{artist_similarity, era_similarity, genre_similarity};
use crate::traits::Layer;
use crate::types::{FeatureValue, ScoreComponent};
use catalog::FeatureVector;

pub const WEIGHT_GENRE: f64 = 0.08;
pub const WEIGHT_ARTIST: f64 = 0.04;
pub const WEIGHT_ERA: f64 = 0.03;

const IDENTICAL: &str = "identical track";

/// Compares genre tags, artist and release decade. Carries 15% of the overall score.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataLayer;

impl Layer for MetadataLayer {
    fn name(&self) -> &str {
        "metadata"
    }

    fn total_weight(&self) -> f64 {
        0.15
    }

    fn compare(&self, a: &FeatureVector, b: &FeatureVector) -> Vec<(&'static str, ScoreComponent)> {
        let identical = a == b;
        let pick = |similarity: f64| if identical { 1.0 } else { similarity };

        let mut genre = ScoreComponent::new(
            pick(genre_similarity(&a.genres, &b.genres)),
            WEIGHT_GENRE,
            FeatureValue::from(a.genres.as_slice()),
            FeatureValue::from(b.genres.as_slice()),
        );
        let mut artist = ScoreComponent::new(
            pick(artist_similarity(a.artist.as_deref(), b.artist.as_deref())),
            WEIGHT_ARTIST,
            a.artist.as_deref(),
            b.artist.as_deref(),
        );
        let mut era = ScoreComponent::new(
            pick(era_similarity(a.release_year, b.release_year)),
            WEIGHT_ERA,
            a.release_year,
            b.release_year,
        );

        if identical {
            genre = genre.with_label(IDENTICAL);
            artist = artist.with_label(IDENTICAL);
            era = era.with_label(IDENTICAL);
        }

        vec![("genre", genre), ("artist", artist), ("era", era)]
    }
}

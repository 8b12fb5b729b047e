//! Song similarity scoring.
//!
//! This crate provides:
//! - Similarity primitives, one per feature
//! - The `Layer` trait and the three fixed layers (audio, musical, metadata)
//! - `LayerAggregator` to run the layers
//! - `ScoreEngine` producing a `MatchResult` with a 0-100 score
//! - `ExplanationGenerator` for the human-readable breakdown
//!
//! ## Architecture
//! A comparison runs in stages:
//! 1. Each layer compares its features and normalizes to `[0, 1]`
//! 2. The engine weights the layers into an overall score
//! 3. The explanation is derived from the same intermediate scores
//!
//! ## Example Usage
//! ```ignore
//! use matcher::ScoreEngine;
//!
//! let engine = ScoreEngine::new();
//! let result = engine.score(&song_a, &song_b);
//! println!("{}: {}", result.overall_score, result.explanation.summary);
//! ```

pub mod similarity;
pub mod traits;
pub mod layers;
pub mod aggregator;
pub mod explanation;
pub mod engine;
pub mod types;

pub use aggregator::LayerAggregator;
pub use engine::{RankedMatch, ScoreEngine, confidence};
pub use explanation::ExplanationGenerator;
pub use traits::Layer;
pub use types::{
    ALGORITHM_VERSION,
    Breakdown,
    Explanation,
    ExplanationDetails,
    FeatureValue,
    LayerResult,
    MatchResult,
    ScoreComponent,
};

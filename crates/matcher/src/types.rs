//! Result types produced by the scoring engine.
//!
//! Everything here is created fresh per scoring call and never mutated
//! afterwards. All of it is serde-serializable so a [`MatchResult`] can be
//! stored verbatim by a cache and read back unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Version tag stamped on every result
pub const ALGORITHM_VERSION: &str = "v1.0.0";

/// Raw input value of one compared feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Missing,
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(v) if v.fract() == 0.0 => write!(f, "{}", v),
            FeatureValue::Number(v) => write!(f, "{:.2}", v),
            FeatureValue::Text(s) => f.write_str(s),
            FeatureValue::List(items) => f.write_str(&items.join(", ")),
            FeatureValue::Missing => f.write_str("-"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<Option<&str>> for FeatureValue {
    fn from(v: Option<&str>) -> Self {
        v.map(|s| FeatureValue::Text(s.to_string()))
            .unwrap_or(FeatureValue::Missing)
    }
}

impl From<Option<i32>> for FeatureValue {
    fn from(v: Option<i32>) -> Self {
        v.map(|y| FeatureValue::Number(y as f64))
            .unwrap_or(FeatureValue::Missing)
    }
}

impl From<&[String]> for FeatureValue {
    fn from(v: &[String]) -> Self {
        if v.is_empty() {
            FeatureValue::Missing
        } else {
            FeatureValue::List(v.to_vec())
        }
    }
}

/// One feature's contribution to a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// Similarity in `[0, 1]`
    pub similarity: f64,
    /// Fixed weight of this feature inside its layer
    pub weight: f64,
    pub value_a: FeatureValue,
    pub value_b: FeatureValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ScoreComponent {
    pub fn new(
        similarity: f64,
        weight: f64,
        value_a: impl Into<FeatureValue>,
        value_b: impl Into<FeatureValue>,
    ) -> Self {
        Self {
            similarity,
            weight,
            value_a: value_a.into(),
            value_b: value_b.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Weighted contribution to the layer sum
    pub fn contribution(&self) -> f64 {
        self.similarity * self.weight
    }

    /// The same component seen from the other song's side
    pub fn swapped(&self) -> Self {
        Self {
            value_a: self.value_b.clone(),
            value_b: self.value_a.clone(),
            ..self.clone()
        }
    }
}

/// Normalized score of one layer plus its components by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    /// Weighted mean similarity in `[0, 1]`
    pub score: f64,
    pub components: BTreeMap<String, ScoreComponent>,
}

impl LayerResult {
    /// Similarity of a named component, if the layer has it
    pub fn similarity(&self, component: &str) -> Option<f64> {
        self.components.get(component).map(|c| c.similarity)
    }

    pub fn swapped(&self) -> Self {
        Self {
            score: self.score,
            components: self
                .components
                .iter()
                .map(|(name, component)| (name.clone(), component.swapped()))
                .collect(),
        }
    }
}

/// Per-layer results of one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Audio descriptors: valence, energy, danceability, tempo, acousticness
    pub layer1: LayerResult,
    /// Musical structure: key, time signature, loudness, duration
    pub layer2: LayerResult,
    /// Metadata: genre, artist, era
    pub layer3: LayerResult,
}

impl Breakdown {
    /// Look a component up across all three layers
    pub fn similarity(&self, component: &str) -> Option<f64> {
        self.layer1
            .similarity(component)
            .or_else(|| self.layer2.similarity(component))
            .or_else(|| self.layer3.similarity(component))
    }

    /// Exchange the raw values of the two songs in every component.
    ///
    /// Every similarity is symmetric, so this is exactly the breakdown of
    /// the reversed comparison.
    pub fn swapped(&self) -> Self {
        Self {
            layer1: self.layer1.swapped(),
            layer2: self.layer2.swapped(),
            layer3: self.layer3.swapped(),
        }
    }
}

/// Human-readable account of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub details: ExplanationDetails,
}

/// Descriptive sentences about the first song of the pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationDetails {
    pub mood: String,
    pub rhythm: String,
    pub harmony: String,
    pub style: String,
}

/// Final outcome of scoring two songs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Overall similarity, 0 to 100
    pub overall_score: u8,
    /// Share of tracked signals that were available, in `[0, 1]`
    pub confidence: f64,
    pub breakdown: Breakdown,
    pub explanation: Explanation,
    /// Wall time spent computing this result
    pub processing_time: Duration,
    pub algorithm_version: String,
}

impl MatchResult {
    /// Compare everything except processing time
    pub fn same_outcome(&self, other: &MatchResult) -> bool {
        self.overall_score == other.overall_score
            && self.confidence == other.confidence
            && self.breakdown == other.breakdown
            && self.explanation == other.explanation
            && self.algorithm_version == other.algorithm_version
    }
}

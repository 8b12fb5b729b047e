//! Rule-based explanations of a comparison.
//!
//! Output depends only on the two feature vectors, the layer breakdown and
//! the overall score, so the same inputs always produce the same text.

use crate::similarity::{decade, is_octave_related};
use crate::types::{Breakdown, Explanation, ExplanationDetails};
use catalog::FeatureVector;
use std::collections::HashSet;

/// Similarity above which a feature is called out as a strength
const STRENGTH_THRESHOLD: f64 = 0.8;
/// Genre overlap is rarer, so a lower bar counts as a strength
const GENRE_STRENGTH_THRESHOLD: f64 = 0.5;
/// Similarity below which a feature is called out as a weakness
const WEAKNESS_THRESHOLD: f64 = 0.5;
const GENRE_WEAKNESS_THRESHOLD: f64 = 0.2;

/// Builds the summary, strengths, weaknesses and details of a result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        a: &FeatureVector,
        b: &FeatureVector,
        breakdown: &Breakdown,
        overall_score: u8,
    ) -> Explanation {
        Explanation {
            summary: summary(overall_score),
            strengths: strengths(a, b, breakdown),
            weaknesses: weaknesses(a, b, breakdown),
            details: ExplanationDetails {
                mood: mood_detail(a),
                rhythm: rhythm_detail(a),
                harmony: format!("Harmony: written in {}", a.key_name()),
                style: style_detail(a),
            },
        }
    }
}

fn summary(score: u8) -> String {
    match score {
        80.. => format!(
            "Strong match ({}%): these songs share much of the same sound and feel.",
            score
        ),
        60..=79 => format!(
            "Good match ({}%): these songs have a lot in common.",
            score
        ),
        40..=59 => format!(
            "Moderate match ({}%): similar in some ways, different in others.",
            score
        ),
        _ => format!(
            "Poor match ({}%): these songs have very different musical characteristics.",
            score
        ),
    }
}

fn strengths(a: &FeatureVector, b: &FeatureVector, breakdown: &Breakdown) -> Vec<String> {
    let mut out = Vec::new();
    let sim = |name: &str| breakdown.similarity(name).unwrap_or(0.0);

    if sim("valence") > STRENGTH_THRESHOLD {
        out.push(format!("Both songs share a {} mood", mood_label(a.valence)));
    }
    if sim("energy") > STRENGTH_THRESHOLD {
        out.push(format!("Both songs have {} energy", energy_level(a.energy)));
    }
    if sim("danceability") > STRENGTH_THRESHOLD {
        out.push(format!(
            "Similar groove: {} and {} danceability",
            percent(a.danceability),
            percent(b.danceability)
        ));
    }
    if sim("tempo") > STRENGTH_THRESHOLD {
        out.push(format!(
            "Similar tempos ({:.0} and {:.0} BPM)",
            a.tempo, b.tempo
        ));
    } else if is_octave_related(a.tempo, b.tempo) {
        out.push(format!(
            "Tempos lock together at half/double time ({:.0} and {:.0} BPM)",
            a.tempo, b.tempo
        ));
    }
    if sim("acousticness") > STRENGTH_THRESHOLD {
        out.push(format!("Both have {} production", production_label(a.acousticness)));
    }
    if sim("key") > STRENGTH_THRESHOLD {
        out.push(format!(
            "Harmonically compatible keys ({} and {})",
            a.key_name(),
            b.key_name()
        ));
    }
    if has_genres(a, b) && sim("genre") > GENRE_STRENGTH_THRESHOLD {
        out.push(format!("Shared genres: {}", shared_genres(a, b).join(", ")));
    }
    if let (Some(artist_a), Some(artist_b)) = (&a.artist, &b.artist) {
        if artist_a == artist_b {
            out.push(format!("Both songs are by {}", artist_a));
        }
    }
    if let (Some(year_a), Some(year_b)) = (a.release_year, b.release_year) {
        if sim("era") > STRENGTH_THRESHOLD && decade(year_a) == decade(year_b) {
            out.push(format!("Both released in the {}", decade_label(year_a)));
        }
    }

    out
}

fn weaknesses(a: &FeatureVector, b: &FeatureVector, breakdown: &Breakdown) -> Vec<String> {
    let mut out = Vec::new();
    let sim = |name: &str| breakdown.similarity(name).unwrap_or(1.0);

    if sim("valence") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Different moods: {} vs {}",
            mood_label(a.valence),
            mood_label(b.valence)
        ));
    }
    if sim("energy") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Energy contrast: {} vs {}",
            energy_label(a.energy),
            energy_label(b.energy)
        ));
    }
    if sim("danceability") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "One is far more danceable ({} vs {})",
            percent(a.danceability),
            percent(b.danceability)
        ));
    }
    if sim("tempo") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Very different tempos ({:.0} vs {:.0} BPM)",
            a.tempo, b.tempo
        ));
    }
    if sim("acousticness") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Production contrast: {} vs {}",
            production_label(a.acousticness),
            production_label(b.acousticness)
        ));
    }
    if sim("key") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Harmonically distant keys ({} vs {})",
            a.key_name(),
            b.key_name()
        ));
    }
    if sim("time_signature") < WEAKNESS_THRESHOLD {
        out.push(format!(
            "Different meters ({} vs {} beats per bar)",
            a.time_signature, b.time_signature
        ));
    }
    if has_genres(a, b) && sim("genre") < GENRE_WEAKNESS_THRESHOLD {
        out.push("No overlapping genres".to_string());
    }
    if let (Some(year_a), Some(year_b)) = (a.release_year, b.release_year) {
        if sim("era") < WEAKNESS_THRESHOLD {
            out.push(format!(
                "Released decades apart ({} vs {})",
                decade_label(year_a),
                decade_label(year_b)
            ));
        }
    }

    out
}

// =============================================================================
// Details (describe the first song only)
// =============================================================================

fn mood_detail(v: &FeatureVector) -> String {
    let quadrant = match (v.valence >= 0.5, v.energy >= 0.5) {
        (true, true) => "upbeat and energetic",
        (true, false) => "cheerful and relaxed",
        (false, true) => "intense and brooding",
        (false, false) => "melancholic and calm",
    };
    format!(
        "Mood: {} (valence {:.2}, energy {:.2})",
        quadrant, v.valence, v.energy
    )
}

fn rhythm_detail(v: &FeatureVector) -> String {
    let pace = if v.tempo < 90.0 {
        "slow"
    } else if v.tempo < 120.0 {
        "moderate"
    } else if v.tempo < 150.0 {
        "fast"
    } else {
        "very fast"
    };
    let groove = if v.danceability >= 0.7 {
        "highly danceable"
    } else if v.danceability >= 0.4 {
        "with a steady groove"
    } else {
        "not built for dancing"
    };
    format!("Rhythm: {} tempo at {:.0} BPM, {}", pace, v.tempo, groove)
}

fn style_detail(v: &FeatureVector) -> String {
    let genres = if v.genres.is_empty() {
        "unknown genre".to_string()
    } else {
        v.genres.join(", ")
    };
    match &v.artist {
        Some(artist) => format!("Style: {} by {}", genres, artist),
        None => format!("Style: {}", genres),
    }
}

// =============================================================================
// Labels
// =============================================================================

fn mood_label(valence: f64) -> &'static str {
    if valence >= 0.6 {
        "happy"
    } else if valence <= 0.4 {
        "sad"
    } else {
        "bittersweet"
    }
}

fn energy_label(energy: f64) -> &'static str {
    if energy >= 0.6 {
        "energetic"
    } else if energy <= 0.4 {
        "mellow"
    } else {
        "moderate"
    }
}

fn energy_level(energy: f64) -> &'static str {
    if energy >= 0.6 {
        "high"
    } else if energy <= 0.4 {
        "low"
    } else {
        "moderate"
    }
}

fn production_label(acousticness: f64) -> &'static str {
    if acousticness >= 0.5 { "acoustic" } else { "electronic" }
}

fn decade_label(year: i32) -> String {
    format!("{}s", decade(year) * 10)
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn has_genres(a: &FeatureVector, b: &FeatureVector) -> bool {
    !a.genres.is_empty() && !b.genres.is_empty()
}

/// Genres of `a` also present in `b`, lowercased, first occurrence order
fn shared_genres(a: &FeatureVector, b: &FeatureVector) -> Vec<String> {
    let theirs: HashSet<String> = b.genres.iter().map(|g| g.to_lowercase()).collect();
    let mut seen = HashSet::new();
    a.genres
        .iter()
        .map(|g| g.to_lowercase())
        .filter(|g| theirs.contains(g) && seen.insert(g.clone()))
        .collect()
}

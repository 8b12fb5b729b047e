//! Per-feature similarity primitives.
//!
//! Every function compares one feature of two songs and returns a value in
//! `[0, 1]`, where 1.0 means "feels the same". They are pure and allocate
//! nothing shared, so they can be called from any thread.

use catalog::Mode;
use std::collections::HashSet;

/// Returned when a piece of optional metadata is missing on either side.
///
/// Unknown is treated as "not dissimilar" rather than as a mismatch.
pub const NEUTRAL: f64 = 0.5;

/// Similarity assigned to tempos an octave apart (double or half time)
pub const TEMPO_OCTAVE_SIMILARITY: f64 = 0.7;

/// Similarity of the same tonic in a different mode (relative major/minor feel)
pub const SAME_KEY_OTHER_MODE: f64 = 0.7;

/// Penalty factor applied to key similarity when the modes differ
const MODE_MISMATCH_FACTOR: f64 = 0.8;

/// Similarity of 3/4 against 6/8-style meters
pub const COMPOUND_METER_SIMILARITY: f64 = 0.7;

/// Similarity of any other pair of differing time signatures
pub const OTHER_METER_SIMILARITY: f64 = 0.3;

const LOUDNESS_FLOOR_DB: f64 = -60.0;

// =============================================================================
// Circle of fifths
// =============================================================================

/// Pitch classes in circle-of-fifths order: C G D A E B F♯ C♯ G♯ D♯ A♯ F
const CIRCLE_OF_FIFTHS: [u8; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

const fn build_fifths_distances() -> [[u8; 12]; 12] {
    // position[pitch_class] = index on the circle
    let mut position = [0u8; 12];
    let mut i = 0;
    while i < 12 {
        position[CIRCLE_OF_FIFTHS[i] as usize] = i as u8;
        i += 1;
    }

    let mut table = [[0u8; 12]; 12];
    let mut a = 0;
    while a < 12 {
        let mut b = 0;
        while b < 12 {
            let pa = position[a];
            let pb = position[b];
            let clockwise = if pa > pb { pa - pb } else { pb - pa };
            let counter = 12 - clockwise;
            table[a][b] = if clockwise < counter { clockwise } else { counter };
            b += 1;
        }
        a += 1;
    }
    table
}

/// Steps between two pitch classes around the circle of fifths, 0..=6
static FIFTHS_DISTANCE: [[u8; 12]; 12] = build_fifths_distances();

/// Circle-of-fifths distance between two pitch classes
pub fn fifths_distance(key_a: u8, key_b: u8) -> u8 {
    FIFTHS_DISTANCE[(key_a % 12) as usize][(key_b % 12) as usize]
}

// =============================================================================
// Layer 1: audio descriptors
// =============================================================================

/// Similarity of two `[0, 1]` descriptors (valence, energy, danceability, acousticness)
pub fn continuous_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs()).clamp(0.0, 1.0)
}

/// Tempo similarity with an octave bonus.
///
/// Tempos whose ratio is within 0.1 of 2 (or of 0.5) feel rhythmically
/// alike and score a flat [`TEMPO_OCTAVE_SIMILARITY`]. Otherwise the score
/// falls linearly to zero at a 50 BPM difference. A non-positive or
/// non-finite tempo on either side scores 0.0.
pub fn tempo_similarity(a: f64, b: f64) -> f64 {
    if !(a.is_finite() && b.is_finite()) || a <= 0.0 || b <= 0.0 {
        return 0.0;
    }

    let ratio = a.max(b) / a.min(b);
    if (ratio - 2.0).abs() < 0.1 || (ratio - 0.5).abs() < 0.1 {
        return TEMPO_OCTAVE_SIMILARITY;
    }

    (1.0 - (a - b).abs() / 50.0).max(0.0)
}

/// Whether two tempos sit an octave apart
pub fn is_octave_related(a: f64, b: f64) -> bool {
    a > 0.0 && b > 0.0 && (a.max(b) / a.min(b) - 2.0).abs() < 0.1
}

// =============================================================================
// Layer 2: musical structure
// =============================================================================

/// Harmonic similarity of two keys.
///
/// Same key and mode is 1.0, same key in the other mode is exactly 0.7.
/// Anything else is `1 - distance / 6` on the circle of fifths, scaled by
/// 0.8 when the modes differ.
pub fn key_similarity(key_a: u8, mode_a: Mode, key_b: u8, mode_b: Mode) -> f64 {
    if key_a == key_b {
        return if mode_a == mode_b { 1.0 } else { SAME_KEY_OTHER_MODE };
    }

    let distance = fifths_distance(key_a, key_b) as f64;
    let similarity = 1.0 - distance / 6.0;
    if mode_a == mode_b {
        similarity
    } else {
        similarity * MODE_MISMATCH_FACTOR
    }
}

/// Time signature similarity: equal 1.0, {3, 6} 0.7, anything else 0.3
pub fn time_signature_similarity(a: u8, b: u8) -> f64 {
    if a == b {
        1.0
    } else if (a == 3 && b == 6) || (a == 6 && b == 3) {
        COMPOUND_METER_SIMILARITY
    } else {
        OTHER_METER_SIMILARITY
    }
}

/// Map loudness from `[-60, 0]` dB onto `[0, 1]`
pub fn normalize_loudness(db: f64) -> f64 {
    ((db - LOUDNESS_FLOOR_DB) / -LOUDNESS_FLOOR_DB).clamp(0.0, 1.0)
}

pub fn loudness_similarity(a_db: f64, b_db: f64) -> f64 {
    1.0 - (normalize_loudness(a_db) - normalize_loudness(b_db)).abs()
}

/// Duration similarity in steps: under 10 s apart 1.0, under 30 s 0.8,
/// under 60 s 0.6, then linear decay reaching zero at five minutes.
pub fn duration_similarity(a_ms: u64, b_ms: u64) -> f64 {
    let diff_secs = a_ms.abs_diff(b_ms) as f64 / 1000.0;
    if diff_secs < 10.0 {
        1.0
    } else if diff_secs < 30.0 {
        0.8
    } else if diff_secs < 60.0 {
        0.6
    } else {
        (1.0 - diff_secs / 300.0).max(0.0)
    }
}

// =============================================================================
// Layer 3: metadata
// =============================================================================

/// Case-insensitive Jaccard similarity of two genre sets.
///
/// Either side empty returns [`NEUTRAL`].
pub fn genre_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<String> = a.iter().map(|g| g.to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|g| g.to_lowercase()).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return NEUTRAL;
    }

    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

/// Exact, case-sensitive artist match; [`NEUTRAL`] if either is unknown
pub fn artist_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a == b => 1.0,
        (Some(_), Some(_)) => 0.0,
        _ => NEUTRAL,
    }
}

/// Decade a year falls in, e.g. 1994 -> 199
pub fn decade(year: i32) -> i32 {
    year.div_euclid(10)
}

/// Release era similarity by decade.
///
/// Same decade 1.0, then minus 0.2 per decade apart, zero from five
/// decades on. [`NEUTRAL`] if either year is unknown.
pub fn era_similarity(a: Option<i32>, b: Option<i32>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let decades_apart = (decade(a) - decade(b)).abs() as f64;
            (1.0 - decades_apart / 5.0).max(0.0)
        }
        _ => NEUTRAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genres(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_continuous() {
        assert_eq!(continuous_similarity(0.5, 0.5), 1.0);
        assert!((continuous_similarity(0.2, 0.8) - 0.4).abs() < 1e-9);
        assert_eq!(continuous_similarity(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_tempo_octave_bonus() {
        let s = tempo_similarity(120.0, 240.0);
        assert!((0.65..=0.75).contains(&s));
        assert_eq!(tempo_similarity(240.0, 120.0), s);
        assert_eq!(tempo_similarity(100.0, 195.0), TEMPO_OCTAVE_SIMILARITY);
    }

    #[test]
    fn test_tempo_linear_decay() {
        assert!(tempo_similarity(120.0, 125.0) > tempo_similarity(120.0, 80.0));
        assert!((tempo_similarity(120.0, 125.0) - 0.9).abs() < 1e-9);
        assert_eq!(tempo_similarity(100.0, 170.0), 0.0);
    }

    #[test]
    fn test_tempo_rejects_degenerate_input() {
        assert_eq!(tempo_similarity(0.0, 120.0), 0.0);
        assert_eq!(tempo_similarity(120.0, -5.0), 0.0);
        assert_eq!(tempo_similarity(f64::NAN, 120.0), 0.0);
        assert_eq!(tempo_similarity(f64::INFINITY, 120.0), 0.0);
    }

    #[test]
    fn test_fifths_table() {
        // C to G is one step, C to F♯ is the far side of the circle
        assert_eq!(fifths_distance(0, 7), 1);
        assert_eq!(fifths_distance(0, 5), 1);
        assert_eq!(fifths_distance(0, 6), 6);
        assert_eq!(fifths_distance(0, 2), 2);
        for a in 0..12 {
            assert_eq!(fifths_distance(a, a), 0);
            for b in 0..12 {
                assert_eq!(fifths_distance(a, b), fifths_distance(b, a));
                assert!(fifths_distance(a, b) <= 6);
            }
        }
    }

    #[test]
    fn test_key_similarity() {
        let c_g = key_similarity(0, Mode::Major, 7, Mode::Major);
        let c_fsharp = key_similarity(0, Mode::Major, 6, Mode::Major);
        assert!(c_g > c_fsharp);
        assert_eq!(key_similarity(0, Mode::Major, 0, Mode::Minor), 0.7);
        assert_eq!(key_similarity(9, Mode::Minor, 9, Mode::Minor), 1.0);
        // G major vs D minor: one step, modes differ
        let g_dm = key_similarity(7, Mode::Major, 2, Mode::Minor);
        assert!((g_dm - (5.0 / 6.0) * 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_time_signature() {
        assert_eq!(time_signature_similarity(4, 4), 1.0);
        assert_eq!(time_signature_similarity(3, 6), 0.7);
        assert_eq!(time_signature_similarity(6, 3), 0.7);
        assert_eq!(time_signature_similarity(4, 3), 0.3);
        assert_eq!(time_signature_similarity(5, 7), 0.3);
    }

    #[test]
    fn test_loudness() {
        assert_eq!(normalize_loudness(-60.0), 0.0);
        assert_eq!(normalize_loudness(0.0), 1.0);
        assert_eq!(normalize_loudness(-80.0), 0.0);
        assert!((loudness_similarity(-5.0, -35.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_duration_steps() {
        assert_eq!(duration_similarity(200_000, 205_000), 1.0);
        assert_eq!(duration_similarity(200_000, 210_000), 0.8);
        assert_eq!(duration_similarity(200_000, 240_000), 0.6);
        assert!((duration_similarity(200_000, 350_000) - 0.5).abs() < 1e-9);
        assert_eq!(duration_similarity(100_000, 500_000), 0.0);
    }

    #[test]
    fn test_genre_jaccard() {
        assert_eq!(genre_similarity(&genres(&["rock"]), &genres(&["jazz"])), 0.0);
        assert_eq!(genre_similarity(&genres(&["rock", "pop"]), &genres(&["Pop", "ROCK"])), 1.0);
        assert_eq!(genre_similarity(&[], &genres(&["jazz"])), NEUTRAL);
        assert_eq!(genre_similarity(&genres(&["rock"]), &[]), NEUTRAL);
        let partial = genre_similarity(&genres(&["rock", "pop"]), &genres(&["pop", "funk", "soul"]));
        assert!((partial - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_artist() {
        assert_eq!(artist_similarity(Some("Björk"), Some("Björk")), 1.0);
        assert_eq!(artist_similarity(Some("Björk"), Some("björk")), 0.0);
        assert_eq!(artist_similarity(None, Some("Björk")), NEUTRAL);
        assert_eq!(artist_similarity(None, None), NEUTRAL);
    }

    #[test]
    fn test_era() {
        assert_eq!(era_similarity(Some(1991), Some(1999)), 1.0);
        assert!((era_similarity(Some(1999), Some(2001)) - 0.8).abs() < 1e-9);
        assert_eq!(era_similarity(Some(1960), Some(2010)), 0.0);
        assert_eq!(era_similarity(Some(1930), Some(2020)), 0.0);
        assert_eq!(era_similarity(Some(2001), None), NEUTRAL);
    }
}

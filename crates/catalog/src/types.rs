//! Core domain types for song matching.
//!
//! A song is described to the rest of the system only through its
//! [`FeatureVector`]: nine mandatory audio descriptors plus three optional
//! pieces of metadata. [`TrackRecord`] wraps a vector with the identity it
//! was fetched under.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Identity
// =============================================================================

/// Opaque identifier of a track on its platform
pub type TrackId = String;

/// Music platform a track record was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    AppleMusic,
    Local,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::AppleMusic => "apple_music",
            Platform::Local => "local",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(Platform::Spotify),
            "apple_music" | "apple-music" | "applemusic" => Ok(Platform::AppleMusic),
            "local" => Ok(Platform::Local),
            other => Err(CatalogError::UnknownPlatform(other.to_string())),
        }
    }
}

// =============================================================================
// Musical mode and key names
// =============================================================================

/// Tonal mode of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Minor,
    Major,
}

impl Mode {
    /// Map the conventional 0 (minor) / 1 (major) encoding
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Mode::Minor),
            1 => Ok(Mode::Major),
            _ => Err(CatalogError::InvalidValue {
                field: "mode".to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Mode::Minor => 0,
            Mode::Major => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Minor => f.write_str("minor"),
            Mode::Major => f.write_str("major"),
        }
    }
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Name of a pitch class (0 = C, 1 = C♯, ... 11 = B)
///
/// Out-of-range values wrap around the octave.
pub fn pitch_class_name(key: u8) -> &'static str {
    PITCH_CLASS_NAMES[(key % 12) as usize]
}

/// Full key name such as "F♯ minor"
pub fn key_name(key: u8, mode: Mode) -> String {
    format!("{} {}", pitch_class_name(key), mode)
}

// =============================================================================
// FeatureVector
// =============================================================================

/// Audio and metadata features describing one song.
///
/// Read-only once built: scoring code only ever borrows it. Ranges are
/// documented per field but are not enforced by construction; call
/// [`FeatureVector::validate`] at the boundary where records enter the
/// system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Musical positiveness, 0.0 (sad) to 1.0 (happy)
    pub valence: f64,
    /// Perceived intensity, 0.0 to 1.0
    pub energy: f64,
    /// Suitability for dancing, 0.0 to 1.0
    pub danceability: f64,
    /// Beats per minute, positive
    pub tempo: f64,
    /// Confidence the track is acoustic, 0.0 to 1.0
    pub acousticness: f64,
    /// Pitch class of the tonic, 0 (C) to 11 (B)
    pub key: u8,
    pub mode: Mode,
    /// Beats per bar, 3 to 7
    pub time_signature: u8,
    /// Average loudness in dB, typically -60 to 0
    pub loudness: f64,
    pub duration_ms: u64,

    /// Lowercase genre tags; empty means unknown
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
}

impl FeatureVector {
    /// Attach genre tags, lowercasing them
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genres = genres
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_release_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    /// Full key name of this track ("C major")
    pub fn key_name(&self) -> String {
        key_name(self.key, self.mode)
    }

    /// Check every mandatory field against its documented domain.
    ///
    /// Tempo must be finite and strictly positive since tempo similarity
    /// divides by the slower of the two tempos.
    pub fn validate(&self) -> Result<()> {
        check_unit("valence", self.valence)?;
        check_unit("energy", self.energy)?;
        check_unit("danceability", self.danceability)?;
        check_unit("acousticness", self.acousticness)?;

        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(invalid("tempo", self.tempo));
        }
        if self.key > 11 {
            return Err(invalid("key", self.key));
        }
        if !(3..=7).contains(&self.time_signature) {
            return Err(invalid("time_signature", self.time_signature));
        }
        if !self.loudness.is_finite() {
            return Err(invalid("loudness", self.loudness));
        }
        if self.duration_ms == 0 {
            return Err(invalid("duration_ms", self.duration_ms));
        }
        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

fn invalid(field: &str, value: impl fmt::Display) -> CatalogError {
    CatalogError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

// =============================================================================
// TrackRecord
// =============================================================================

/// A feature vector together with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub platform: Platform,
    pub id: TrackId,
    pub title: String,
    pub features: FeatureVector,
}

impl TrackRecord {
    pub fn new(platform: Platform, id: impl Into<TrackId>, title: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            platform,
            id: id.into(),
            title: title.into(),
            features,
        }
    }

    /// "Title - Artist", or just the title when the artist is unknown
    pub fn display_name(&self) -> String {
        match &self.features.artist {
            Some(artist) => format!("{} - {}", self.title, artist),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            valence: 0.8,
            energy: 0.7,
            danceability: 0.75,
            tempo: 120.0,
            acousticness: 0.3,
            key: 0,
            mode: Mode::Major,
            time_signature: 4,
            loudness: -5.0,
            duration_ms: 200_000,
            genres: vec![],
            artist: None,
            release_year: None,
        }
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("Spotify".parse::<Platform>().unwrap(), Platform::Spotify);
        assert_eq!("apple-music".parse::<Platform>().unwrap(), Platform::AppleMusic);
        assert!("napster".parse::<Platform>().is_err());
        assert_eq!(Platform::AppleMusic.to_string(), "apple_music");
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(0, Mode::Major), "C major");
        assert_eq!(key_name(6, Mode::Minor), "F♯ minor");
        assert_eq!(pitch_class_name(23), "B");
    }

    #[test]
    fn test_with_genres_lowercases_and_drops_blanks() {
        let v = sample().with_genres(["Indie Rock", " ", "POP"]);
        assert_eq!(v.genres, vec!["indie rock".to_string(), "pop".to_string()]);
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_tempo() {
        let v = FeatureVector { tempo: 0.0, ..sample() };
        match v.validate() {
            Err(CatalogError::InvalidValue { field, .. }) => assert_eq!(field, "tempo"),
            other => panic!("expected tempo error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        assert!(FeatureVector { valence: 1.2, ..sample() }.validate().is_err());
        assert!(FeatureVector { key: 12, ..sample() }.validate().is_err());
        assert!(FeatureVector { time_signature: 2, ..sample() }.validate().is_err());
        assert!(FeatureVector { duration_ms: 0, ..sample() }.validate().is_err());
        assert!(FeatureVector { tempo: f64::NAN, ..sample() }.validate().is_err());
    }

    #[test]
    fn test_optional_fields_survive_json() {
        let v = sample().with_artist("Daft Punk").with_release_year(2001);
        let json = serde_json::to_string(&v).unwrap();
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(back.genres.is_empty());
    }
}

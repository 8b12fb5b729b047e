//! Parser for track record files.
//!
//! One record per line, fields separated by `::`:
//!
//! ```text
//! platform::id::title::artist::year::genres::valence::energy::danceability::tempo::acousticness::key::mode::time_signature::loudness::duration_ms
//! ```
//!
//! `genres` is pipe-separated. `artist`, `year` and `genres` may be empty,
//! meaning unknown. Blank lines and lines starting with `#` are skipped.
//! Every parsed record is validated before it is returned.

use crate::error::{CatalogError, Result};
use crate::types::*;
use std::path::Path;
use std::str::FromStr;

/// Number of `::`-separated fields in one record line
pub const FIELD_COUNT: usize = 16;

/// Parse a whole record file
pub fn parse_tracks(path: &Path) -> Result<Vec<TrackRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CatalogError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => CatalogError::IoError(e),
    })?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_str(&content, &file)
}

/// Parse record lines from an in-memory string
///
/// `file` is only used to label parse errors.
pub fn parse_str(content: &str, file: &str) -> Result<Vec<TrackRecord>> {
    let mut tracks = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        tracks.push(parse_line(trimmed, file, line_no)?);
    }

    Ok(tracks)
}

/// Parse one record line
pub fn parse_line(line: &str, file: &str, line_no: usize) -> Result<TrackRecord> {
    let parts: Vec<&str> = line.split("::").map(str::trim).collect();
    if parts.len() != FIELD_COUNT {
        return Err(CatalogError::FieldCountMismatch {
            expected: FIELD_COUNT,
            found: parts.len(),
            line: line_no,
        });
    }

    let field = |name: &str, value: &str| -> CatalogError {
        CatalogError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: format!("Invalid {}: {:?}", name, value),
        }
    };

    let platform = Platform::from_str(parts[0])?;
    let id = parts[1];
    if id.is_empty() {
        return Err(field("id", id));
    }
    let title = parts[2];

    let artist = non_empty(parts[3]).map(str::to_string);
    let release_year = match non_empty(parts[4]) {
        Some(y) => Some(y.parse::<i32>().map_err(|_| field("year", y))?),
        None => None,
    };
    let genres: Vec<String> = parts[5]
        .split('|')
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .collect();

    let number = |name: &str, value: &str| -> Result<f64> {
        value.parse::<f64>().map_err(|_| field(name, value))
    };
    let mode: u8 = parts[12].parse().map_err(|_| field("mode", parts[12]))?;

    let features = FeatureVector {
        valence: number("valence", parts[6])?,
        energy: number("energy", parts[7])?,
        danceability: number("danceability", parts[8])?,
        tempo: number("tempo", parts[9])?,
        acousticness: number("acousticness", parts[10])?,
        key: parts[11].parse().map_err(|_| field("key", parts[11]))?,
        mode: Mode::from_u8(mode)?,
        time_signature: parts[13].parse().map_err(|_| field("time_signature", parts[13]))?,
        loudness: number("loudness", parts[14])?,
        duration_ms: parts[15].parse().map_err(|_| field("duration_ms", parts[15]))?,
        genres,
        artist,
        release_year,
    };
    features.validate()?;

    Ok(TrackRecord::new(platform, id, title, features))
}

/// Format a record back into its line representation
pub fn format_line(record: &TrackRecord) -> String {
    let f = &record.features;
    format!(
        "{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}::{}",
        record.platform,
        record.id,
        record.title,
        f.artist.as_deref().unwrap_or(""),
        f.release_year.map(|y| y.to_string()).unwrap_or_default(),
        f.genres.join("|"),
        f.valence,
        f.energy,
        f.danceability,
        f.tempo,
        f.acousticness,
        f.key,
        f.mode.as_u8(),
        f.time_signature,
        f.loudness,
        f.duration_ms,
    )
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

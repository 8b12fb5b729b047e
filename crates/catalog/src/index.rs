//! TrackCatalog building and lookup.
//!
//! The catalog is the in-memory record set that backs the bundled
//! feature source: a primary index keyed by `(platform, id)`, an artist
//! index for search, and insertion order so search results are stable.

use crate::error::{CatalogError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Composite primary key of a track
pub type TrackKey = (Platform, TrackId);

/// In-memory store of track records.
#[derive(Debug, Default)]
pub struct TrackCatalog {
    tracks: HashMap<TrackKey, TrackRecord>,
    /// Insertion order, used to keep search results deterministic
    order: Vec<TrackKey>,
    /// Lowercased artist name to track keys
    artist_index: HashMap<String, Vec<TrackKey>>,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a record file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading track records from {:?}", path);
        let records = parser::parse_tracks(path)?;

        let mut catalog = TrackCatalog::new();
        for record in records {
            catalog.insert(record)?;
        }

        info!("Loaded {} tracks", catalog.len());
        Ok(catalog)
    }

    /// Insert a record, rejecting duplicates
    pub fn insert(&mut self, record: TrackRecord) -> Result<()> {
        let key = (record.platform, record.id.clone());
        if self.tracks.contains_key(&key) {
            return Err(CatalogError::DuplicateTrack {
                platform: record.platform.to_string(),
                id: record.id,
            });
        }

        if let Some(artist) = &record.features.artist {
            self.artist_index
                .entry(artist.to_lowercase())
                .or_insert_with(Vec::new)
                .push(key.clone());
        }
        self.order.push(key.clone());
        self.tracks.insert(key, record);
        Ok(())
    }

    /// Get a record by platform and id
    pub fn get(&self, platform: Platform, id: &str) -> Option<&TrackRecord> {
        self.tracks.get(&(platform, id.to_string()))
    }

    /// All tracks by an artist (case-insensitive exact name)
    pub fn by_artist(&self, artist: &str) -> Vec<&TrackRecord> {
        self.artist_index
            .get(&artist.to_lowercase())
            .map(|keys| keys.iter().filter_map(|k| self.tracks.get(k)).collect())
            .unwrap_or_default()
    }

    /// Case-insensitive substring search over title and artist.
    ///
    /// Exact title matches rank first, then title substrings, then artist
    /// matches; ties keep catalog insertion order.
    pub fn search(&self, query: &str, limit: usize, offset: usize) -> Vec<&TrackRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<(u8, usize, &TrackRecord)> = self
            .order
            .par_iter()
            .enumerate()
            .filter_map(|(pos, key)| {
                let record = self.tracks.get(key)?;
                let title = record.title.to_lowercase();
                let rank = if title == needle {
                    0
                } else if title.contains(&needle) {
                    1
                } else if record
                    .features
                    .artist
                    .as_ref()
                    .is_some_and(|a| a.to_lowercase().contains(&needle))
                {
                    2
                } else {
                    return None;
                };
                Some((rank, pos, record))
            })
            .collect();

        matches.sort_by_key(|(rank, pos, _)| (*rank, *pos));
        matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, _, record)| record)
            .collect()
    }

    /// Iterate records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TrackRecord> {
        self.order.iter().filter_map(|k| self.tracks.get(k))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

//! # Catalog Crate
//!
//! Domain types for song matching and the in-memory track catalog.
//!
//! ## Main Components
//!
//! - **types**: `FeatureVector`, `TrackRecord`, `Platform`, `Mode`
//! - **parser**: Parse `::`-separated record files into `TrackRecord`s
//! - **index**: `TrackCatalog`, a searchable in-memory record set
//! - **error**: Error types for loading and validation
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{Platform, TrackCatalog};
//! use std::path::Path;
//!
//! let catalog = TrackCatalog::load_from_file(Path::new("data/tracks.dat"))?;
//! let track = catalog.get(Platform::Spotify, "4uLU6hMCjMI75M1A2tKUQC").unwrap();
//! println!("{} at {} BPM", track.display_name(), track.features.tempo);
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;

pub use error::{CatalogError, Result};
pub use index::{TrackCatalog, TrackKey};
pub use types::{
    FeatureVector,
    Mode,
    Platform,
    TrackId,
    TrackRecord,
    key_name,
    pitch_class_name,
};

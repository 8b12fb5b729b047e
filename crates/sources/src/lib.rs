//! # Sources Crate
//!
//! Where feature records come from.
//!
//! ## Components
//!
//! ### FeatureSource
//! The async trait every provider implements: fetch one record by
//! `(platform, id)`, or search by free text. Failures are reported as
//! [`UpstreamError`] (not found, rate limited, timed out, unavailable).
//!
//! ### CatalogSource
//! A provider answering from an in-memory `TrackCatalog`, used by the
//! bundled binaries and tests.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{CatalogSource, FeatureSource};
//! use catalog::{Platform, TrackCatalog};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(TrackCatalog::load_from_file(path)?);
//! let source = CatalogSource::new(catalog);
//! let record = source.fetch_by_id(Platform::Spotify, "4uLU6hMCjMI75M1A2tKUQC").await?;
//! ```

pub mod source;
pub mod catalog_source;

pub use catalog_source::CatalogSource;
pub use source::{FeatureSource, UpstreamError};

//! Error types for the catalog crate.
//!
//! Everything that can go wrong while reading a record file or checking a
//! feature vector at the system boundary ends up here.

use thiserror::Error;

/// Errors that can occur while loading, parsing or validating track records
#[derive(Error, Debug)]
pub enum CatalogError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a record file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A feature field had a value outside its domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Expected number of fields in a line doesn't match actual
    #[error("Expected {expected} fields but found {found} in line {line}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },

    /// Platform name not recognised
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// Two records share the same (platform, id)
    #[error("Duplicate track {platform}:{id}")]
    DuplicateTrack { platform: String, id: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;

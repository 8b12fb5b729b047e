//! Server crate for the song-match similarity engine.
//!
//! Holds the configuration and the orchestrator that wires the score
//! engine, both caches and a feature source together.

pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, ConfigOverrides, MatchConfig};
pub use orchestrator::{CacheStats, MatchOrchestrator, TrackMatch};

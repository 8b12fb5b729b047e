//! Runtime configuration.
//!
//! Resolution order (highest priority first):
//! 1. Command-line flags and `SONG_MATCH_*` environment variables
//! 2. The TOML file given with `--config`
//! 3. Compiled defaults

use matcher::ALGORITHM_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    Validation { field: &'static str, message: String },
}

/// Everything the orchestrator and the binaries can be tuned with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Version tag stamped on every result
    pub algorithm_version: String,
    pub result_ttl_secs: u64,
    pub source_ttl_secs: u64,
    /// How long an expired source entry stays in the store before the
    /// store drops it on its own
    pub source_retention_grace_secs: u64,
    /// Entries inspected by result cache stats
    pub stats_sample_size: usize,
    /// Sweeper daemon period
    pub sweep_interval_secs: u64,
    /// Record file backing the catalog feature source
    pub catalog_path: PathBuf,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            algorithm_version: ALGORITHM_VERSION.to_string(),
            result_ttl_secs: 7 * 24 * 60 * 60,
            source_ttl_secs: 30 * 24 * 60 * 60,
            source_retention_grace_secs: 24 * 60 * 60,
            stats_sample_size: 100,
            sweep_interval_secs: 60 * 60,
            catalog_path: PathBuf::from("data/tracks.dat"),
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub result_ttl_secs: Option<u64>,
    pub source_ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

impl MatchConfig {
    /// Defaults, then the optional file, then overrides; validated last
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse TOML text. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.catalog_path {
            self.catalog_path = path.clone();
        }
        if let Some(ttl) = overrides.result_ttl_secs {
            self.result_ttl_secs = ttl;
        }
        if let Some(ttl) = overrides.source_ttl_secs {
            self.source_ttl_secs = ttl;
        }
        if let Some(interval) = overrides.sweep_interval_secs {
            self.sweep_interval_secs = interval;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("result_ttl_secs", self.result_ttl_secs),
            ("source_ttl_secs", self.source_ttl_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field,
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if self.algorithm_version.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "algorithm_version",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn source_ttl(&self) -> Duration {
        Duration::from_secs(self.source_ttl_secs)
    }

    pub fn source_retention_grace(&self) -> Duration {
        Duration::from_secs(self.source_retention_grace_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.algorithm_version, "v1.0.0");
        assert_eq!(config.result_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.source_ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.source_retention_grace(), Duration::from_secs(86_400));
        assert_eq!(config.stats_sample_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MatchConfig::from_toml(
            r#"
            result_ttl_secs = 60
            catalog_path = "fixtures/tracks.dat"
            "#,
        )
        .unwrap();
        assert_eq!(config.result_ttl_secs, 60);
        assert_eq!(config.catalog_path, PathBuf::from("fixtures/tracks.dat"));
        assert_eq!(config.source_ttl_secs, 2_592_000);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = MatchConfig::from_toml("source_ttl_secs = 0").unwrap();
        match config.validate() {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "source_ttl_secs"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            MatchConfig::from_toml("result_ttl_secs = \"soon\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            result_ttl_secs: Some(5),
            catalog_path: Some(PathBuf::from("other.dat")),
            ..Default::default()
        };
        let config = MatchConfig::load(None, &overrides).unwrap();
        assert_eq!(config.result_ttl_secs, 5);
        assert_eq!(config.catalog_path, PathBuf::from("other.dat"));
    }

    #[test]
    fn test_override_validated() {
        let overrides = ConfigOverrides {
            sweep_interval_secs: Some(0),
            ..Default::default()
        };
        assert!(MatchConfig::load(None, &overrides).is_err());
    }
}

//! Engine configuration loaded from TOML.

use std::path::Path;

use safety_map_scoring::ScoringConfig;
use safety_map_spatial::GeometryConfig;
use serde::{Deserialize, Serialize};

/// Default configuration, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML is malformed or has wrongly typed values.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but violate constraints.
    #[error("Invalid config: {}", .problems.join("; "))]
    Invalid {
        /// One message per violated constraint.
        problems: Vec<String>,
    },
}

/// All engine tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scoring constants.
    pub scoring: ScoringConfig,
    /// Shape conversion and region matching constants.
    pub geometry: GeometryConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is out
    /// of range.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file. Omitted keys keep their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Loads the file named by `SAFETY_MAP_SCORING_CONFIG`, or the
    /// embedded default when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the named file cannot be read or is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("SAFETY_MAP_SCORING_CONFIG") {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) => Self::from_toml(DEFAULT_CONFIG_TOML),
        }
    }

    /// Checks every constant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = self.scoring.problems();
        problems.extend(self.geometry.problems());
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }

    /// Renders the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

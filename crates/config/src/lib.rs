//! Scribe Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use scribe_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[output]\ndestinations = [\"stderr\"]").unwrap();
//! assert_eq!(config.output.destinations, vec!["stderr".to_string()]);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [output]
//! level = "info"
//! format = "json"
//! enable_level_routing = true
//! routing_mode = "duplicate"
//!
//! [output.level_destinations]
//! all = ["stdout", "/var/log/app/app.log"]
//! error = ["/var/log/app/error.log"]
//!
//! [output.rotation]
//! enable_time_rotation = true
//! time_pattern = "%Y-%m-%d"
//! max_age = 7
//! compress = true
//! ```

mod error;
mod output;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use output::{LogFormat, OutputConfig, RotationConfig};
pub use validation::validate_time_pattern;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log output: level, destinations, routing, rotation
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

//! Configuration validation
//!
//! Validates config consistency:
//! - At least one destination is configured for the active routing style
//! - Destination strings are not empty
//! - Rotation values are usable (size threshold, time pattern)
//!
//! Unknown level keys in `level_destinations` are left to the router, which
//! drops them with a warning.

use std::fmt::Write;

use chrono::DateTime;
use chrono::format::{Item, StrftimeItems};

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::output::{OutputConfig, RotationConfig};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_output(&config.output)?;
    validate_rotation(&config.output.rotation)?;
    Ok(())
}

/// Validate destinations and level routing
fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.enable_level_routing {
        if output.level_destinations.is_empty() {
            return Err(ConfigError::NoDestinations(
                "level routing is enabled but level_destinations is empty",
            ));
        }
    } else if output.destinations.is_empty() {
        return Err(ConfigError::NoDestinations("destinations is empty"));
    }

    if output
        .referenced_destinations()
        .iter()
        .any(|destination| destination.trim().is_empty())
    {
        return Err(ConfigError::invalid_value(
            "output",
            "destinations",
            "destination paths must not be empty",
        ));
    }

    Ok(())
}

/// Validate rotation settings
fn validate_rotation(rotation: &RotationConfig) -> Result<()> {
    if rotation.max_size_mb == 0 {
        return Err(ConfigError::invalid_value(
            "output.rotation",
            "max_size_mb",
            "must be greater than 0",
        ));
    }

    if rotation.enable_time_rotation {
        validate_time_pattern(&rotation.time_pattern)?;
    }

    Ok(())
}

/// A time pattern must be non-empty and fully understood by chrono
pub fn validate_time_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(ConfigError::invalid_value(
            "output.rotation",
            "time_pattern",
            "must not be empty",
        ));
    }

    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::invalid_value(
            "output.rotation",
            "time_pattern",
            format!("'{pattern}' is not a valid strftime pattern"),
        ));
    }

    // %D and %x render slashes too, so check a rendered sample
    let mut sample = String::new();
    let rendered = DateTime::from_timestamp(1_735_830_245, 0)
        .map(|at| write!(sample, "{}", at.format(pattern)).is_ok())
        .unwrap_or(false);
    if !rendered || sample.contains('/') || sample.contains('\\') {
        return Err(ConfigError::invalid_value(
            "output.rotation",
            "time_pattern",
            "bucket labels must not contain path separators",
        ));
    }

    Ok(())
}

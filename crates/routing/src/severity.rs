//! Severity levels and routing keys
//!
//! `Severity` is the total order every level predicate compares against:
//! trace < debug < info < warn < error < fatal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::RoutingError;

/// Ordered log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    /// Very verbose diagnostics
    Trace,
    /// Debugging information
    Debug,
    /// Normal operation (default)
    #[default]
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// An operation failed
    Error,
    /// The process cannot continue
    Fatal,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Lowercase name, as used in configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Uppercase name, as rendered by text encoders
    pub const fn as_upper_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(RoutingError::unknown_level(s)),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Key of one `level → destinations` configuration entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKey {
    /// The `all` sentinel: every record at or above the minimum level
    All,
    /// One concrete severity
    Level(Severity),
}

impl LevelKey {
    /// Sentinel name for the catch-all rule
    pub const ALL: &'static str = "all";

    /// Parse a configuration key
    pub fn parse(key: &str) -> Result<Self, RoutingError> {
        if key.trim().eq_ignore_ascii_case(Self::ALL) {
            return Ok(Self::All);
        }
        key.parse().map(Self::Level)
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::ALL),
            Self::Level(severity) => severity.fmt(f),
        }
    }
}

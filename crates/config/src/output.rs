//! Log output configuration
//!
//! Controls where records go: the minimum level, the destinations, level
//! routing and file rotation.

use std::collections::BTreeMap;

use scribe_routing::{LevelKey, RoutingMode, RoutingRule, Severity};
use serde::Deserialize;

/// Record encoding
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console lines (default)
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Output configuration
///
/// # Example
///
/// ```toml
/// [output]
/// level = "info"
/// format = "json"
/// enable_level_routing = true
/// routing_mode = "duplicate"
///
/// [output.level_destinations]
/// all = ["stdout", "logs/app.log"]
/// error = ["logs/error.log"]
///
/// [output.rotation]
/// enable_time_rotation = true
/// time_pattern = "%Y-%m-%d"
/// max_age = 7
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Minimum level for the `all` rule
    /// Default: info
    pub level: Severity,

    /// Encoding (console, json)
    /// Default: console
    pub format: LogFormat,

    /// ANSI colors for level labels in console format
    /// Default: false
    pub color: bool,

    /// Destinations when level routing is off
    /// Default: ["stdout"]
    pub destinations: Vec<String>,

    /// Use `level_destinations` instead of `destinations`
    /// Default: false
    pub enable_level_routing: bool,

    /// How level rules select records (duplicate, above, exact)
    /// Default: above
    pub routing_mode: RoutingMode,

    /// Level key (`all` or a severity) → destinations
    pub level_destinations: BTreeMap<String, Vec<String>>,

    /// File rotation and retention
    pub rotation: RotationConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            level: Severity::Info,
            format: LogFormat::Console,
            color: false,
            destinations: vec!["stdout".into()],
            enable_level_routing: false,
            routing_mode: RoutingMode::Above,
            level_destinations: BTreeMap::new(),
            rotation: RotationConfig::default(),
        }
    }
}

impl OutputConfig {
    /// Routing mode the rules are compiled under
    ///
    /// With level routing off the implicit `all` rule needs duplicate mode,
    /// whatever `routing_mode` says.
    pub fn effective_routing_mode(&self) -> RoutingMode {
        if self.enable_level_routing {
            self.routing_mode
        } else {
            RoutingMode::Duplicate
        }
    }

    /// Routing rules for the level router
    ///
    /// With level routing off, every destination forms one implicit `all`
    /// rule at `level` and above.
    pub fn routing_rules(&self) -> Vec<RoutingRule> {
        if !self.enable_level_routing {
            return vec![RoutingRule::new(LevelKey::ALL, self.destinations.iter().cloned())];
        }

        self.level_destinations
            .iter()
            .map(|(key, destinations)| RoutingRule::new(key.clone(), destinations.iter().cloned()))
            .collect()
    }

    /// Every destination string referenced by the active rules
    pub fn referenced_destinations(&self) -> Vec<&str> {
        let mut destinations: Vec<&str> = Vec::new();
        let lists: Vec<&Vec<String>> = if self.enable_level_routing {
            self.level_destinations.values().collect()
        } else {
            vec![&self.destinations]
        };

        for list in lists {
            for destination in list {
                if !destinations.contains(&destination.as_str()) {
                    destinations.push(destination.as_str());
                }
            }
        }

        destinations
    }
}

/// Rotation configuration
///
/// Time rotation appends a bucket label rendered from `time_pattern` to each
/// file name; otherwise files rotate when they reach `max_size_mb`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Rotate by time bucket instead of size
    /// Default: false
    pub enable_time_rotation: bool,

    /// strftime pattern for the bucket label
    /// Default: "%Y-%m-%d" (daily)
    pub time_pattern: String,

    /// Size threshold in megabytes (size rotation)
    /// Default: 100
    pub max_size_mb: u64,

    /// Backups kept by size rotation (0 = unlimited)
    /// Default: 10
    pub max_backups: usize,

    /// Retention in bucket units (days for size rotation, 0 = keep forever)
    /// Default: 30
    pub max_age: u32,

    /// Compress superseded files
    /// Default: true
    pub compress: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enable_time_rotation: false,
            time_pattern: "%Y-%m-%d".into(),
            max_size_mb: 100,
            max_backups: 10,
            max_age: 30,
            compress: true,
        }
    }
}

impl RotationConfig {
    /// Size threshold in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

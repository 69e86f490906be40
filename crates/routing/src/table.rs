//! Level route table
//!
//! The route table is compiled once when the sink is built. Every route owns
//! a level predicate and the deduplicated writer ids of its destinations;
//! emitting a record walks the routes and keeps those whose predicate
//! accepts the record's severity.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::{Result, RoutingError};
use crate::severity::{LevelKey, Severity};
use crate::WriterId;

/// How level rules select records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// `all` takes everything from the minimum level, other rules take their
    /// exact level only. A record can match `all` and its own level rule.
    Duplicate,
    /// A rule for level `L` takes every record at `L` or above (default).
    /// `all` is not a level here and is dropped.
    #[default]
    Above,
    /// A rule for level `L` takes records at exactly `L`; `all` is dropped
    Exact,
}

impl RoutingMode {
    /// Lowercase name, as used in configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Above => "above",
            Self::Exact => "exact",
        }
    }

    /// Predicate for a rule keyed by `key` under this mode
    ///
    /// Returns `None` for `all` outside duplicate mode.
    pub fn filter_for(self, key: LevelKey, min_level: Severity) -> Option<LevelFilter> {
        match (self, key) {
            (Self::Duplicate, LevelKey::All) => Some(LevelFilter::AtLeast(min_level)),
            (Self::Above | Self::Exact, LevelKey::All) => None,
            (Self::Above, LevelKey::Level(level)) => Some(LevelFilter::AtLeast(level)),
            (Self::Duplicate | Self::Exact, LevelKey::Level(level)) => {
                Some(LevelFilter::Exactly(level))
            }
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duplicate" => Ok(Self::Duplicate),
            "above" => Ok(Self::Above),
            "exact" => Ok(Self::Exact),
            _ => Err(RoutingError::unknown_mode(s)),
        }
    }
}

impl<'de> Deserialize<'de> for RoutingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Level predicate of one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFilter {
    /// Accepts `severity >= level`
    AtLeast(Severity),
    /// Accepts `severity == level`
    Exactly(Severity),
}

impl LevelFilter {
    /// Check whether a record of `severity` passes this filter
    #[inline]
    pub fn accepts(self, severity: Severity) -> bool {
        match self {
            Self::AtLeast(level) => severity >= level,
            Self::Exactly(level) => severity == level,
        }
    }

    /// Lowest severity this filter accepts
    #[inline]
    pub fn floor(self) -> Severity {
        match self {
            Self::AtLeast(level) | Self::Exactly(level) => level,
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast(level) => write!(f, ">= {level}"),
            Self::Exactly(level) => write!(f, "== {level}"),
        }
    }
}

/// One `level → destinations` entry, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    /// A severity name or `all`
    pub level_key: String,

    /// Destination strings (`stdout`, `stderr` or a file path)
    pub destinations: Vec<String>,
}

impl RoutingRule {
    /// Create a rule
    pub fn new<I, S>(level_key: impl Into<String>, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            level_key: level_key.into(),
            destinations: destinations.into_iter().map(Into::into).collect(),
        }
    }
}

/// A compiled route: predicate plus the writers it fans out to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The key this route was built from
    pub key: LevelKey,

    /// Level predicate
    pub filter: LevelFilter,

    /// Writers in declaration order, no duplicates
    pub writers: Vec<WriterId>,
}

impl Route {
    /// Check whether this route takes a record of `severity`
    #[inline]
    pub fn accepts(&self, severity: Severity) -> bool {
        self.filter.accepts(severity)
    }
}

/// Pre-compiled level routing table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    /// Routes, `all` first then ascending severity
    routes: Vec<Route>,

    /// Destination strings indexed by `WriterId`
    destinations: Vec<String>,

    /// Level keys that could not be parsed and were dropped
    skipped: Vec<String>,
}

impl RouteTable {
    /// All routes in evaluation order
    #[inline]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes whose predicate accepts `severity`
    #[inline]
    pub fn routes_for(&self, severity: Severity) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |route| route.accepts(severity))
    }

    /// Check if any route takes a record of `severity`
    #[inline]
    pub fn accepts(&self, severity: Severity) -> bool {
        self.routes.iter().any(|route| route.accepts(severity))
    }

    /// Lowest severity any route accepts
    pub fn min_level(&self) -> Option<Severity> {
        self.routes.iter().map(|route| route.filter.floor()).min()
    }

    /// Every registered destination, indexed by `WriterId`
    #[inline]
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Destination string of a writer id
    #[inline]
    pub fn destination(&self, id: WriterId) -> Option<&str> {
        self.destinations.get(id.as_usize()).map(String::as_str)
    }

    /// Level keys dropped because they did not name a severity, or named
    /// `all` outside duplicate mode
    #[inline]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Number of routes
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table has no routes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder that compiles routing rules into a `RouteTable`
///
/// Destinations are registered by their configured string. Registering the
/// same string twice yields the same `WriterId`, so a file shared between
/// rules maps to a single writer.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    /// Registered destinations: string → id
    writer_ids: HashMap<String, WriterId>,

    /// Destination strings in registration order
    destinations: Vec<String>,
}

impl RouteTableBuilder {
    /// Create a new builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination and get its id
    ///
    /// If the destination is already registered, returns the existing id.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::TooManyDestinations` once every id is taken.
    pub fn register_destination(&mut self, destination: impl Into<String>) -> Result<WriterId> {
        let destination = destination.into();
        if let Some(&id) = self.writer_ids.get(&destination) {
            return Ok(id);
        }

        let Ok(index) = u16::try_from(self.destinations.len()) else {
            return Err(RoutingError::TooManyDestinations { destination });
        };
        let id = WriterId::new(index);
        self.writer_ids.insert(destination.clone(), id);
        self.destinations.push(destination);
        Ok(id)
    }

    /// Get the id of a registered destination
    #[inline]
    pub fn get_writer_id(&self, destination: &str) -> Option<WriterId> {
        self.writer_ids.get(destination).copied()
    }

    /// Compile `rules` under `mode`
    ///
    /// Rules whose level key is not a severity are dropped with a warning, as
    /// is `all` outside duplicate mode. Rules without destinations produce
    /// no route.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::NoRoutes` if nothing is left to write to, and
    /// `RoutingError::TooManyDestinations` past `u16::MAX + 1` destinations.
    pub fn build(
        mut self,
        rules: &[RoutingRule],
        mode: RoutingMode,
        min_level: Severity,
    ) -> Result<RouteTable> {
        let mut skipped = Vec::new();
        let mut keyed: Vec<(LevelKey, LevelFilter, &RoutingRule)> = Vec::with_capacity(rules.len());

        for rule in rules {
            let key = match LevelKey::parse(&rule.level_key) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(
                        level_key = %rule.level_key,
                        error = %e,
                        "dropping routing rule with unknown level"
                    );
                    skipped.push(rule.level_key.clone());
                    continue;
                }
            };
            match mode.filter_for(key, min_level) {
                Some(filter) => keyed.push((key, filter, rule)),
                None => {
                    tracing::warn!(
                        level_key = %rule.level_key,
                        mode = %mode,
                        "dropping routing rule: 'all' only applies in duplicate mode"
                    );
                    skipped.push(rule.level_key.clone());
                }
            }
        }

        // Stable: ties keep declaration order
        keyed.sort_by_key(|(key, _, _)| match key {
            LevelKey::All => 0,
            LevelKey::Level(level) => 1 + *level as u8,
        });

        let mut routes = Vec::with_capacity(keyed.len());
        for (key, filter, rule) in keyed {
            let mut writers: Vec<WriterId> = Vec::with_capacity(rule.destinations.len());
            for destination in &rule.destinations {
                let id = self.register_destination(destination.as_str())?;
                if !writers.contains(&id) {
                    writers.push(id);
                }
            }

            if writers.is_empty() {
                tracing::debug!(level_key = %key, "routing rule has no destinations");
                continue;
            }

            routes.push(Route {
                key,
                filter,
                writers,
            });
        }

        if routes.is_empty() {
            return Err(RoutingError::NoRoutes);
        }

        tracing::debug!(
            mode = %mode,
            routes = routes.len(),
            destinations = self.destinations.len(),
            "route table compiled"
        );

        Ok(RouteTable {
            routes,
            destinations: self.destinations,
            skipped,
        })
    }
}

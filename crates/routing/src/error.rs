//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur during route table compilation
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Severity name not recognised
    #[error("unknown log level '{name}'")]
    UnknownLevel {
        /// The unparseable name
        name: String,
    },

    /// Routing mode name not recognised
    #[error("unknown routing mode '{name}' (expected duplicate, above or exact)")]
    UnknownMode {
        /// The unparseable name
        name: String,
    },

    /// More distinct destinations than `WriterId` can address
    #[error("too many destinations, cannot register '{destination}'")]
    TooManyDestinations {
        /// The destination that did not fit
        destination: String,
    },

    /// Every rule was dropped or empty, so records have nowhere to go
    #[error("no valid log output configured")]
    NoRoutes,
}

impl RoutingError {
    /// Create an UnknownLevel error
    #[inline]
    pub fn unknown_level(name: impl Into<String>) -> Self {
        Self::UnknownLevel { name: name.into() }
    }

    /// Create an UnknownMode error
    #[inline]
    pub fn unknown_mode(name: impl Into<String>) -> Self {
        Self::UnknownMode { name: name.into() }
    }
}

//! Writer identifier type
//!
//! `WriterId` is a lightweight, Copy handle for one physical destination.
//! The route table hands out one id per distinct destination string, and the
//! sink keeps its writers in a `Vec` indexed by these ids.

use std::fmt;

/// Identifier of one resolved destination writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriterId(u16);

impl WriterId {
    /// Maximum number of destinations supported
    pub const MAX: u16 = u16::MAX;

    /// Create a writer id from a numeric index
    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get the numeric index of this writer
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Get the index as usize (for slice indexing)
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "writer:{}", self.0)
    }
}

impl From<u16> for WriterId {
    #[inline]
    fn from(index: u16) -> Self {
        Self::new(index)
    }
}

//! Destination resolver
//!
//! Maps configured destination strings to writer instances. The resolver is
//! the single authority for that mapping: it caches writers keyed by the
//! resolved path, so two configurations naming the same file share one
//! writer instead of racing to rotate it.
//!
//! | Destination | Writer |
//! |-------------|--------|
//! | `stdout` / `stderr` | [`ConsoleWriter`] |
//! | path, time rotation on | [`TimeRotationWriter`] |
//! | path, time rotation off | [`SizeRotationWriter`] |

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use scribe_config::RotationConfig;

use crate::common::SinkError;
use crate::console::{ConsoleStream, ConsoleWriter};
use crate::size_rotation::{SizeRotationConfig, SizeRotationWriter};
use crate::time_rotation::{TimeRotationConfig, TimeRotationWriter};
use crate::util::{Clock, SystemClock};
use crate::writer::LogWriter;

/// A parsed destination string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Standard stream, no file-system lifecycle
    Console(ConsoleStream),
    /// File owned by exactly one rotating writer
    File(PathBuf),
}

impl Destination {
    /// Parse a configured destination
    pub fn parse(destination: &str) -> Result<Self, SinkError> {
        if destination.trim().is_empty() {
            return Err(SinkError::EmptyDestination);
        }
        Ok(match ConsoleStream::parse(destination) {
            Some(stream) => Self::Console(stream),
            None => Self::File(PathBuf::from(destination)),
        })
    }

    pub fn is_console(&self) -> bool {
        matches!(self, Self::Console(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console(stream) => write!(f, "{stream}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Deduplicating destination → writer cache
pub struct DestinationResolver {
    rotation: RotationConfig,
    clock: Arc<dyn Clock>,
    writers: DashMap<String, Arc<dyn LogWriter>>,
}

impl DestinationResolver {
    /// Resolver creating file writers from `rotation`
    pub fn new(rotation: RotationConfig) -> Self {
        Self::with_clock(rotation, Arc::new(SystemClock))
    }

    /// Resolver whose file writers read time from `clock`
    pub fn with_clock(rotation: RotationConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rotation,
            clock,
            writers: DashMap::new(),
        }
    }

    /// Writer for `destination`, created on first use
    ///
    /// Repeated calls for the same resolved path return the same instance.
    /// Creating a file writer creates its parent directory right away, so an
    /// unwritable location fails here rather than on the first record.
    pub fn resolve(&self, destination: &str) -> Result<Arc<dyn LogWriter>, SinkError> {
        let parsed = Destination::parse(destination)?;
        let key = cache_key(&parsed).map_err(|e| SinkError::resolve(destination, e))?;

        if let Some(writer) = self.writers.get(&key) {
            return Ok(Arc::clone(writer.value()));
        }

        match self.writers.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let writer = self.create(destination, &parsed, Path::new(entry.key()))?;
                tracing::debug!(destination = %destination, writer = writer.name(), "resolved destination");
                entry.insert(Arc::clone(&writer));
                Ok(writer)
            }
        }
    }

    fn create(
        &self,
        destination: &str,
        parsed: &Destination,
        resolved: &Path,
    ) -> Result<Arc<dyn LogWriter>, SinkError> {
        if let Destination::Console(stream) = parsed {
            return Ok(Arc::new(ConsoleWriter::new(*stream)));
        }

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|e| SinkError::resolve(destination, e))?;
        }

        let writer: Arc<dyn LogWriter> = if self.rotation.enable_time_rotation {
            let config = TimeRotationConfig::from_rotation(resolved, &self.rotation);
            Arc::new(TimeRotationWriter::with_clock(config, Arc::clone(&self.clock))?)
        } else {
            let config = SizeRotationConfig::from_rotation(resolved, &self.rotation);
            Arc::new(SizeRotationWriter::with_clock(config, Arc::clone(&self.clock))?)
        };
        Ok(writer)
    }

    /// Previously resolved writer for `destination`
    pub fn get(&self, destination: &str) -> Option<Arc<dyn LogWriter>> {
        let key = cache_key(&Destination::parse(destination).ok()?).ok()?;
        self.writers.get(&key).map(|w| Arc::clone(w.value()))
    }

    /// Number of distinct writers created
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

/// Console streams by name, files by absolute path
fn cache_key(destination: &Destination) -> io::Result<String> {
    Ok(match destination {
        Destination::Console(stream) => stream.as_str().to_owned(),
        Destination::File(path) => std::path::absolute(path)?.to_string_lossy().into_owned(),
    })
}

impl fmt::Debug for DestinationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationResolver")
            .field("time_rotation", &self.rotation.enable_time_rotation)
            .field("writers", &self.writers.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;

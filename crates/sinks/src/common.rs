//! Common types and utilities for sinks
//!
//! Errors and counters shared by the writers and the composite sink.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use scribe_routing::RoutingError;
use thiserror::Error;

/// Counters kept by a composite sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records passed to `emit`
    pub records_emitted: AtomicU64,

    /// Successful destination writes (one record can produce several)
    pub deliveries: AtomicU64,

    /// Total bytes written across destinations
    pub bytes_written: AtomicU64,

    /// Destination writes that failed
    pub write_errors: AtomicU64,

    /// Flush operations performed
    pub flush_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            records_emitted: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// Record an emitted record
    #[inline]
    pub fn record_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful destination write
    #[inline]
    pub fn delivered(&self, bytes: u64) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed destination write
    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush operation
    #[inline]
    pub fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_emitted.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
        self.flush_count.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_emitted: u64,
    pub deliveries: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub flush_count: u64,
}

/// Sink construction and lifecycle errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Routing rules compiled to nothing, or a name did not parse
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Destination string was empty
    #[error("destination path is empty")]
    EmptyDestination,

    /// Destination could not be prepared (directory creation failed)
    #[error("cannot resolve destination '{destination}': {source}")]
    Resolve {
        destination: String,
        #[source]
        source: io::Error,
    },

    /// Time pattern cannot be rendered
    #[error("invalid time pattern '{pattern}'")]
    InvalidPattern { pattern: String },

    /// Failed to flush a destination
    #[error("flush failed for '{destination}': {source}")]
    Flush {
        destination: String,
        #[source]
        source: io::Error,
    },

    /// Failed to close a destination
    #[error("close failed for '{destination}': {source}")]
    Close {
        destination: String,
        #[source]
        source: io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SinkError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolve error
    pub fn resolve(destination: impl Into<String>, source: io::Error) -> Self {
        Self::Resolve {
            destination: destination.into(),
            source,
        }
    }
}

/// One destination write that failed during `emit`
#[derive(Debug, Error)]
#[error("write to '{destination}' failed: {source}")]
pub struct WriteFailure {
    /// Destination string as configured
    pub destination: String,
    /// Underlying error
    #[source]
    pub source: io::Error,
}

/// Aggregate of every failed destination write for one record
///
/// Delivery to the other destinations was still attempted.
#[derive(Debug, Error)]
#[error("log write failed for {} of {attempted} destinations", .failures.len())]
pub struct EmitError {
    failures: Vec<WriteFailure>,
    attempted: usize,
}

impl EmitError {
    pub(crate) fn new(failures: Vec<WriteFailure>, attempted: usize) -> Self {
        Self {
            failures,
            attempted,
        }
    }

    /// Individual failures, in delivery order
    pub fn failures(&self) -> &[WriteFailure] {
        &self.failures
    }

    /// Number of destination writes attempted
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// True when no destination accepted the record
    pub fn is_total(&self) -> bool {
        self.failures.len() >= self.attempted
    }

    /// Consume into the list of failures
    pub fn into_failures(self) -> Vec<WriteFailure> {
        self.failures
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;

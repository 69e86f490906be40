//! Scribe - Sinks
//!
//! Level-routed log output with time- and size-rotating files.
//!
//! # Architecture
//!
//! ```text
//! OutputConfig
//!   → RouteTableBuilder (scribe-routing)  → RouteTable
//!   → DestinationResolver                 → Arc<dyn LogWriter> per path
//!   → CompositeSink
//!
//! [caller] --emit(severity, bytes)--> [CompositeSink] --> [pipelines] --> [writers]
//!                                                                      ↓ (rotation)
//!                                                            [RetentionWorker thread]
//! ```
//!
//! # Writers
//!
//! | Writer | Destination | Rotation |
//! |--------|-------------|----------|
//! | `console` | `stdout`, `stderr` | No |
//! | `time_rotation` | file path | On time bucket change |
//! | `size_rotation` | file path | On size threshold |
//!
//! # Example
//!
//! ```ignore
//! use scribe_config::Config;
//! use scribe_sinks::{CompositeSink, Record};
//! use scribe_routing::Severity;
//!
//! let config = Config::from_file("scribe.toml")?;
//! let sink = CompositeSink::build(&config.output)?;
//!
//! sink.log(&Record::new(Severity::Info, "service started"))?;
//! sink.close()?;
//! ```

// =============================================================================
// Writers
// =============================================================================

/// Destination writer trait
pub mod writer;

/// Console writer - stdout / stderr passthrough
pub mod console;

/// Time-rotating file writer
pub mod time_rotation;

/// Size-rotating file writer
pub mod size_rotation;

// =============================================================================
// Composition
// =============================================================================

/// Destination string → shared writer
pub mod resolver;

/// Records and encoders
pub mod encoder;

/// Fan-out over level-routed pipelines
pub mod composite;

/// `tracing` bridge layer
pub mod layer;

// =============================================================================
// Shared utilities
// =============================================================================

/// Clock, time patterns, compression, retention
pub mod util;

/// Errors and metrics
pub mod common;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use common::{EmitError, MetricsSnapshot, SinkError, SinkMetrics, WriteFailure};
pub use composite::CompositeSink;
pub use console::{ConsoleStream, ConsoleWriter};
pub use encoder::{Encoder, Record};
pub use layer::SinkLayer;
pub use resolver::{Destination, DestinationResolver};
pub use size_rotation::{SizeRotationConfig, SizeRotationWriter};
pub use time_rotation::{TimeRotationConfig, TimeRotationWriter};
pub use writer::LogWriter;

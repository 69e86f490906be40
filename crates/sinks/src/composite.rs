//! Composite sink
//!
//! The object callers write through. Built once from the output
//! configuration: the level router compiles the rules into a route table,
//! the resolver turns each destination into a shared writer, and each route
//! becomes a pipeline of writer slots.
//!
//! ```text
//! emit(severity, bytes)
//!   → pipelines whose filter accepts severity
//!     → every writer of the pipeline, in order
//!       → failures collected, delivery continues
//! ```
//!
//! Writes happen synchronously and sequentially inside one `emit` call.
//! Concurrent callers are serialized per writer by the writer itself.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scribe_config::OutputConfig;
use scribe_routing::{LevelFilter, RouteTable, RouteTableBuilder, Severity};

use crate::common::{EmitError, MetricsSnapshot, SinkError, SinkMetrics, WriteFailure};
use crate::encoder::{Encoder, Record};
use crate::resolver::DestinationResolver;
use crate::util::RateLimitedLogger;
use crate::writer::LogWriter;

/// One distinct writer instance
struct Slot {
    destination: String,
    writer: Arc<dyn LogWriter>,
    closed: AtomicBool,
}

/// Level predicate plus the slots it delivers to
#[derive(Debug, Clone)]
struct Pipeline {
    filter: LevelFilter,
    slots: Vec<usize>,
}

/// Fan-out sink over level-routed pipelines
pub struct CompositeSink {
    table: RouteTable,
    pipelines: Vec<Pipeline>,
    slots: Vec<Slot>,
    encoder: Encoder,
    metrics: SinkMetrics,
    failure_log: RateLimitedLogger,
}

impl CompositeSink {
    /// Build the sink described by `config`
    ///
    /// # Errors
    ///
    /// Fails if no route survives or a destination cannot be resolved. The
    /// sink is never partially constructed.
    pub fn build(config: &OutputConfig) -> Result<Self, SinkError> {
        let resolver = DestinationResolver::new(config.rotation.clone());
        Self::build_with_resolver(config, &resolver)
    }

    /// Build through an existing resolver, sharing its writer cache
    pub fn build_with_resolver(
        config: &OutputConfig,
        resolver: &DestinationResolver,
    ) -> Result<Self, SinkError> {
        let rules = config.routing_rules();
        let table = RouteTableBuilder::new().build(
            &rules,
            config.effective_routing_mode(),
            config.level,
        )?;

        for key in table.skipped() {
            tracing::warn!(level_key = %key, "level_destinations entry ignored");
        }

        let writers = table
            .destinations()
            .iter()
            .map(|destination| resolver.resolve(destination))
            .collect::<Result<Vec<_>, _>>()?;

        let encoder = Encoder::from_format(config.format, config.color);
        Self::from_parts(table, writers, encoder)
    }

    /// Assemble a sink from a compiled table and one writer per destination
    ///
    /// `writers[i]` serves the destination with `WriterId` index `i`. Writer
    /// instances shared between destinations are written and closed once.
    pub fn from_parts(
        table: RouteTable,
        writers: Vec<Arc<dyn LogWriter>>,
        encoder: Encoder,
    ) -> Result<Self, SinkError> {
        if writers.len() != table.destinations().len() {
            return Err(SinkError::config(format!(
                "route table has {} destinations but {} writers were supplied",
                table.destinations().len(),
                writers.len()
            )));
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(writers.len());
        let mut slot_of: Vec<usize> = Vec::with_capacity(writers.len());

        for (destination, writer) in table.destinations().iter().zip(writers) {
            match slots.iter().position(|slot| Arc::ptr_eq(&slot.writer, &writer)) {
                Some(index) => slot_of.push(index),
                None => {
                    slot_of.push(slots.len());
                    slots.push(Slot {
                        destination: destination.clone(),
                        writer,
                        closed: AtomicBool::new(false),
                    });
                }
            }
        }

        let pipelines = table
            .routes()
            .iter()
            .map(|route| {
                let mut pipeline_slots: Vec<usize> = Vec::with_capacity(route.writers.len());
                for id in &route.writers {
                    let slot = slot_of[id.as_usize()];
                    if !pipeline_slots.contains(&slot) {
                        pipeline_slots.push(slot);
                    }
                }
                Pipeline {
                    filter: route.filter,
                    slots: pipeline_slots,
                }
            })
            .collect();

        tracing::debug!(
            routes = table.len(),
            writers = slots.len(),
            "composite sink built"
        );

        Ok(Self {
            table,
            pipelines,
            slots,
            encoder,
            metrics: SinkMetrics::new(),
            failure_log: RateLimitedLogger::default(),
        })
    }

    /// Deliver one encoded record to every accepting pipeline
    ///
    /// A failed destination never stops delivery to the others.
    ///
    /// # Errors
    ///
    /// Returns every failed destination write; `EmitError::is_total` tells
    /// whether any destination received the record.
    pub fn emit(&self, severity: Severity, encoded: &[u8]) -> Result<(), EmitError> {
        self.metrics.record_emitted();

        let mut attempted = 0usize;
        let mut failures = Vec::new();

        for pipeline in self.pipelines.iter().filter(|p| p.filter.accepts(severity)) {
            for &index in &pipeline.slots {
                let slot = &self.slots[index];
                attempted += 1;

                match slot.writer.write(encoded) {
                    Ok(n) => self.metrics.delivered(n as u64),
                    Err(e) => {
                        self.metrics.write_error();
                        self.failure_log.warn(&slot.destination, &e);
                        failures.push(WriteFailure {
                            destination: slot.destination.clone(),
                            source: e,
                        });
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EmitError::new(failures, attempted))
        }
    }

    /// Encode `record` once and emit it
    pub fn log(&self, record: &Record) -> Result<(), EmitError> {
        if !self.enabled(record.severity) {
            return Ok(());
        }
        let encoded = self.encoder.encode(record);
        self.emit(record.severity, &encoded)
    }

    /// Sync every writer
    ///
    /// # Errors
    ///
    /// Returns the first failure; the remaining writers are still synced.
    pub fn flush(&self) -> Result<(), SinkError> {
        self.metrics.flush();
        let mut first_error = None;

        for slot in &self.slots {
            if let Err(e) = slot.writer.sync()
                && first_error.is_none()
            {
                first_error = Some(SinkError::Flush {
                    destination: slot.destination.clone(),
                    source: e,
                });
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Close every file-backed writer exactly once and flush console streams
    ///
    /// # Errors
    ///
    /// Returns the first failure; the remaining writers are still closed.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut first_error = None;

        for slot in &self.slots {
            let result = if slot.writer.is_file_backed() {
                if slot.closed.swap(true, Ordering::AcqRel) {
                    continue;
                }
                slot.writer.close()
            } else {
                slot.writer.sync()
            };

            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(SinkError::Close {
                    destination: slot.destination.clone(),
                    source: e,
                });
            }
        }

        tracing::debug!(writers = self.slots.len(), "composite sink closed");
        first_error.map_or(Ok(()), Err)
    }

    /// Lowest severity any pipeline accepts
    pub fn min_level(&self) -> Option<Severity> {
        self.table.min_level()
    }

    /// Whether a record of `severity` would reach any destination
    #[inline]
    pub fn enabled(&self, severity: Severity) -> bool {
        self.table.accepts(severity)
    }

    /// The compiled routing table
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn encoder(&self) -> Encoder {
        self.encoder
    }

    /// Number of distinct writer instances
    pub fn writer_count(&self) -> usize {
        self.slots.len()
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Current counter values
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl fmt::Debug for CompositeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSink")
            .field("routes", &self.table.len())
            .field("writers", &self.slots.len())
            .field("encoder", &self.encoder)
            .finish()
    }
}

#[cfg(test)]
#[path = "composite_test.rs"]
mod composite_test;

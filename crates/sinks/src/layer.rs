//! Bridge from `tracing` to a composite sink
//!
//! `SinkLayer` turns every tracing event into a [`Record`] and logs it
//! through the sink. Events emitted by this crate are skipped, otherwise a
//! failing destination would feed its own failure reports back into itself.

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use scribe_routing::Severity;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::composite::CompositeSink;
use crate::encoder::Record;

/// Target prefix of events this crate emits about itself
const OWN_TARGET: &str = "scribe_sinks";

/// Tracing layer forwarding events to a [`CompositeSink`]
#[derive(Debug, Clone)]
pub struct SinkLayer {
    sink: Arc<CompositeSink>,
}

impl SinkLayer {
    pub fn new(sink: Arc<CompositeSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<CompositeSink> {
        &self.sink
    }
}

/// Map a tracing level onto a severity
pub fn severity_of(level: &tracing::Level) -> Severity {
    match *level {
        tracing::Level::ERROR => Severity::Error,
        tracing::Level::WARN => Severity::Warn,
        tracing::Level::INFO => Severity::Info,
        tracing::Level::DEBUG => Severity::Debug,
        tracing::Level::TRACE => Severity::Trace,
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET) {
            return;
        }

        let severity = severity_of(metadata.level());
        if !self.sink.enabled(severity) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut spans = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                spans.push(span.name());
            }
        }

        let message = if spans.is_empty() {
            visitor.message
        } else {
            format!("{}: {}", spans.join("::"), visitor.message)
        };

        let mut record = Record::new(severity, message).with_target(metadata.target());
        record.fields = visitor.fields;

        // failures are already counted and reported by the sink
        let _ = self.sink.log(&record);
    }
}

/// Collects the message and structured fields of an event
#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.clear();
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), Value::from(format!("{value:?}")));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }
}

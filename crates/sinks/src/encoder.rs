//! Records and their encodings
//!
//! A [`Record`] is one structured log event. The [`Encoder`] picked at build
//! time turns it into one line of bytes, shared by every route.
//!
//! # Output Format
//!
//! Text:
//! ```text
//! 2025-01-02 15:04:05.000 [INFO] api request completed status=200 path=/users
//! ```
//!
//! JSON:
//! ```text
//! {"timestamp":"2025-01-02 15:04:05.000","level":"info","logger":"api","message":"request completed","path":"/users","status":200}
//! ```

use std::fmt::Write as FmtWrite;

use chrono::{DateTime, Local};
use owo_colors::{OwoColorize, Style};
use scribe_config::LogFormat;
use scribe_routing::Severity;
use serde::Serialize;
use serde_json::{Map, Value};

/// Timestamp layout used by both encodings
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Keys the JSON encoding writes itself
const RESERVED_KEYS: [&str; 4] = ["timestamp", "level", "logger", "message"];

/// One structured log event
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    /// Component that produced the record
    pub target: String,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl Record {
    /// Record stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            target: String::new(),
            message: message.into(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Record encoding, fixed when the sink is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// One JSON object per line
    Json,
    /// Human-readable line, optionally with a colored level
    Text { color: bool },
}

impl Default for Encoder {
    fn default() -> Self {
        Self::Text { color: false }
    }
}

impl Encoder {
    /// Encoder for the configured output format
    pub fn from_format(format: LogFormat, color: bool) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Console => Self::Text { color },
        }
    }

    /// Encode `record` as one newline-terminated line
    pub fn encode(&self, record: &Record) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + record.message.len());
        self.encode_into(record, &mut buf);
        buf
    }

    /// Append the encoding of `record` to `buf`
    pub fn encode_into(&self, record: &Record, buf: &mut Vec<u8>) {
        match self {
            Self::Json => encode_json(record, buf),
            Self::Text { color } => encode_text(record, *color, buf),
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    logger: &'a str,
    message: &'a str,
    #[serde(flatten)]
    fields: &'a Map<String, Value>,
}

fn encode_json(record: &Record, buf: &mut Vec<u8>) {
    // fields never shadow the envelope; colliding keys move under "field."
    let renamed;
    let fields = if record.fields.keys().any(|k| RESERVED_KEYS.contains(&k.as_str())) {
        renamed = record
            .fields
            .iter()
            .map(|(k, v)| {
                if RESERVED_KEYS.contains(&k.as_str()) {
                    (format!("field.{k}"), v.clone())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect::<Map<String, Value>>();
        &renamed
    } else {
        &record.fields
    };

    let line = JsonLine {
        timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        level: record.severity.as_str(),
        logger: &record.target,
        message: &record.message,
        fields,
    };

    let start = buf.len();
    if let Err(e) = serde_json::to_writer(&mut *buf, &line) {
        tracing::debug!(error = %e, "json encoding failed, falling back to text");
        buf.truncate(start);
        encode_text(record, false, buf);
        return;
    }
    buf.push(b'\n');
}

fn level_style(severity: Severity) -> Style {
    match severity {
        Severity::Fatal => Style::new().red().bold(),
        Severity::Error => Style::new().red(),
        Severity::Warn => Style::new().yellow(),
        Severity::Info => Style::new().green(),
        Severity::Debug => Style::new().blue(),
        Severity::Trace => Style::new().dimmed(),
    }
}

fn encode_text(record: &Record, color: bool, buf: &mut Vec<u8>) {
    let mut line = String::with_capacity(64 + record.message.len());

    let _ = write!(line, "{} ", record.timestamp.format(TIMESTAMP_FORMAT));

    let label = format!("[{}]", record.severity.as_upper_str());
    if color {
        let _ = write!(line, "{}", label.style(level_style(record.severity)));
    } else {
        line.push_str(&label);
    }

    if !record.target.is_empty() {
        line.push(' ');
        line.push_str(&record.target);
    }

    line.push(' ');
    line.push_str(&record.message);

    for (key, value) in &record.fields {
        let _ = write!(line, " {key}=");
        write_text_value(&mut line, value);
    }

    line.push('\n');
    buf.extend_from_slice(line.as_bytes());
}

/// Bare strings stay bare unless they would break `key=value` parsing
fn write_text_value(line: &mut String, value: &Value) {
    match value {
        Value::String(s) if !needs_quoting(s) => line.push_str(s),
        other => {
            let _ = write!(line, "{other}");
        }
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

#[cfg(test)]
#[path = "encoder_test.rs"]
mod encoder_test;

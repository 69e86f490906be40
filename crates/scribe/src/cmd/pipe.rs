//! Pipe command - Route stdin lines through the sink
//!
//! Each line becomes one record. A leading `LEVEL:` prefix (any severity
//! name, case-insensitive) sets the record's severity; other lines use
//! `--level`.
//!
//! # Usage
//!
//! ```bash
//! printf 'error: disk full\nstarted\n' | scribe pipe --config configs/scribe.toml
//! ```

use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use scribe_routing::Severity;
use scribe_sinks::Record;

/// Pipe command arguments
#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Severity for lines without a level prefix
    #[arg(long, default_value = "info")]
    pub level: Severity,

    /// Logger name recorded on every line
    #[arg(long, default_value = "stdin")]
    pub target: String,
}

/// Split an optional `LEVEL:` prefix off `line`
pub fn parse_line(line: &str, default: Severity) -> (Severity, &str) {
    if let Some((head, rest)) = line.split_once(':')
        && let Ok(severity) = head.parse::<Severity>()
    {
        return (severity, rest.trim_start());
    }
    (default, line)
}

/// Run the pipe command
pub fn run(config_path: &Path, args: PipeArgs) -> Result<()> {
    let (_, sink) = super::build_sink(config_path)?;

    let mut undelivered = 0u64;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.is_empty() {
            continue;
        }

        let (severity, message) = parse_line(&line, args.level);
        let record = Record::new(severity, message).with_target(args.target.as_str());

        if let Err(e) = sink.log(&record)
            && e.is_total()
        {
            undelivered += 1;
        }
    }

    let flushed = sink.flush();
    sink.close().context("failed to close log sink")?;
    flushed.context("failed to flush log sink")?;

    let metrics = sink.metrics_snapshot();
    tracing::info!(
        records = metrics.records_emitted,
        deliveries = metrics.deliveries,
        bytes = metrics.bytes_written,
        write_errors = metrics.write_errors,
        undelivered,
        "pipe finished"
    );

    if undelivered > 0 {
        anyhow::bail!("{undelivered} records reached no destination");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_prefix() {
        assert_eq!(parse_line("error: disk full", Severity::Info), (Severity::Error, "disk full"));
        assert_eq!(parse_line("WARNING:low memory", Severity::Info), (Severity::Warn, "low memory"));
        assert_eq!(parse_line("Debug : x", Severity::Info), (Severity::Debug, "x"));
    }

    #[test]
    fn test_no_prefix_uses_default() {
        assert_eq!(parse_line("started", Severity::Warn), (Severity::Warn, "started"));
        assert_eq!(
            parse_line("url: http://example.com", Severity::Info),
            (Severity::Info, "url: http://example.com")
        );
        assert_eq!(parse_line("", Severity::Info), (Severity::Info, ""));
    }
}

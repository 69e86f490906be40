//! Command implementations for the scribe CLI

pub mod check;
pub mod pipe;

use std::path::Path;

use anyhow::{Context, Result};
use scribe_config::Config;
use scribe_sinks::CompositeSink;

/// Load the configuration and build the process-wide sink
pub fn build_sink(config_path: &Path) -> Result<(Config, CompositeSink)> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let sink = CompositeSink::build(&config.output).context("failed to build log sink")?;
    Ok((config, sink))
}

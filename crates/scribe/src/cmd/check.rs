//! Check command - Validate configuration and show routes
//!
//! Builds the sink exactly as `pipe` would (resolving every destination and
//! creating missing directories) and prints the compiled routing table.
//!
//! # Usage
//!
//! ```bash
//! scribe check --config configs/scribe.toml
//! ```
//!
//! ```text
//! mode: duplicate   min level: info   writers: 2
//!   all      >= info   logs/app.log
//!   error    == error  logs/error.log
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Treat ignored level_destinations entries as errors
    #[arg(long)]
    pub strict: bool,
}

/// Run the check command
pub fn run(config_path: &Path, args: CheckArgs) -> Result<()> {
    let (config, sink) = super::build_sink(config_path)?;
    let table = sink.table();

    let min_level = sink
        .min_level()
        .map_or_else(|| "-".to_string(), |level| level.to_string());
    println!(
        "mode: {}   min level: {}   writers: {}",
        config.output.effective_routing_mode().as_str(),
        min_level,
        sink.writer_count()
    );

    for route in table.routes() {
        let destinations: Vec<&str> = route
            .writers
            .iter()
            .filter_map(|id| table.destination(*id))
            .collect();
        println!(
            "  {:<8} {:<9} {}",
            route.key.to_string(),
            route.filter.to_string(),
            destinations.join(", ")
        );
    }

    for key in table.skipped() {
        println!("  ignored level key: {key}");
    }

    sink.close()?;

    if args.strict && !table.skipped().is_empty() {
        anyhow::bail!(
            "{} level_destinations entr{} ignored",
            table.skipped().len(),
            if table.skipped().len() == 1 { "y" } else { "ies" }
        );
    }

    Ok(())
}

//! Scribe - Level-routed log output
//!
//! # Usage
//!
//! ```bash
//! # Validate a configuration and print its routes
//! scribe check --config configs/scribe.toml
//!
//! # Route stdin lines through the configured sink
//! tail -f app.out | scribe pipe --config configs/scribe.toml
//! echo "error: disk full" | scribe pipe --level info
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Scribe - Level-routed log output
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, default_value = "configs/scribe.toml", global = true)]
    config: std::path::PathBuf,

    /// Diagnostics level on stderr (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration and print the routing table
    Check(cmd::check::CheckArgs),

    /// Route stdin lines through the configured sink
    Pipe(cmd::pipe::PipeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Check(args) => cmd::check::run(&cli.config, args),
        Command::Pipe(args) => cmd::pipe::run(&cli.config, args),
    }
}

/// Initialize the diagnostics subscriber (stderr only)
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("warn"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();

    Ok(())
}

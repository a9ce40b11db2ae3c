//! Tenor CLI binary.
//!
//! Loads long-format factor and price CSV files and prints factor evaluation
//! reports or IC decay curves.

mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            common,
            buckets,
            descending,
            aggregate,
            lookback,
            output,
        } => commands::evaluate(&common, buckets, descending, aggregate, lookback, output.as_deref()),
        Commands::Decay {
            common,
            horizons,
            delays,
            method,
            statistic,
        } => commands::decay(&common, &horizons, &delays, method, &statistic),
    }
}

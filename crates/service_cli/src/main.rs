//! riskagg - command-line FAIR portfolio risk aggregation
//!
//! # Commands
//!
//! - `riskagg aggregate --input <file>` - Run a Monte Carlo aggregation
//! - `riskagg check` - Show version, worker threads and engine limits
//!
//! Engine defaults come from an optional TOML file (`--config`). Run
//! parameters in the request file take precedence over it, and command-line
//! flags take precedence over both.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use commands::aggregate::{AggregateArgs, OutputFormat};

/// FAIR portfolio risk aggregation CLI
#[derive(Parser)]
#[command(name = "riskagg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "riskagg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a portfolio read from a JSON request file
    Aggregate {
        /// Path to the request file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of Monte Carlo trials
        #[arg(short, long)]
        runs: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Confidence level; repeat for several
        #[arg(long = "confidence")]
        confidence: Vec<f64>,

        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check system configuration and engine limits
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = config::CliConfig::load(&cli.config)?;

    match cli.command {
        Commands::Aggregate {
            input,
            runs,
            seed,
            confidence,
            format,
            output,
        } => commands::aggregate::run(
            &config,
            &AggregateArgs {
                input,
                runs,
                seed,
                confidence_levels: (!confidence.is_empty()).then_some(confidence),
                format: format.parse::<OutputFormat>()?,
                output,
            },
        ),
        Commands::Check => commands::check::run(&config),
    }
}

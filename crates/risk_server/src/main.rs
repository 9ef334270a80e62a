//! Risk aggregation server
//!
//! REST API for FAIR portfolio risk aggregation.

use clap::Parser;
use risk_server::config::{build_config, CliArgs as ConfigCliArgs};
use risk_server::server::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Risk aggregation server - REST API for portfolio Monte Carlo aggregation
#[derive(Parser, Debug)]
#[command(name = "risk_server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long, env = "RISK_SERVER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "RISK_SERVER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RISK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Dedicated simulation worker threads
    #[arg(long, env = "RISK_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

impl From<Args> for ConfigCliArgs {
    fn from(args: Args) -> Self {
        ConfigCliArgs {
            config_file: args.config,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            worker_threads: args.worker_threads,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cli_args: ConfigCliArgs = args.into();
    let config = build_config(&cli_args)?;

    init_tracing(config.log_level.as_filter_str());

    tracing::info!("Risk aggregation server v{}", risk_server::VERSION);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_level = %config.log_level,
        environment = %config.environment,
        max_simulation_runs = config.max_simulation_runs,
        simulation_timeout_ms = config.simulation_timeout_ms,
        worker_threads = ?config.worker_threads,
        "Server configuration loaded"
    );

    let server = Server::new(config)?;
    tracing::info!(address = %server.socket_addr()?, "Starting server");

    server.run().await?;

    Ok(())
}

//! Stalewatch CLI
//!
//! Serves the HTTP entries or runs a single check from a request file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stalewatch::api::HttpServer;
use stalewatch::checks::{self, BackupMode, EntryResponse};
use stalewatch::config::LoggingConfig;
use stalewatch::context::Services;
use stalewatch::Config;

/// Stalewatch - backup and key freshness checks
#[derive(Parser)]
#[command(name = "stalewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STALEWATCH_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP entries
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Run one backup check from a JSON request file
    CheckBackups {
        /// Request file
        #[arg(long)]
        request: PathBuf,

        /// Evaluate only, do not start backups
        #[arg(long)]
        check_only: bool,
    },

    /// Run one service-account key check from a JSON request file
    CheckKeys {
        /// Request file
        #[arg(long)]
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Error reading .env: {e}");
        }
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    init_logging(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await,
        Commands::CheckBackups {
            request,
            check_only,
        } => {
            let mode = if check_only {
                BackupMode::CheckOnly
            } else {
                BackupMode::CheckAndRemediate
            };
            run_check_backups(&config, &request, mode).await
        }
        Commands::CheckKeys { request } => run_check_keys(&config, &request).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
}

async fn run_serve(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<ExitCode> {
    let services = Services::from_config(&config)?;

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    };

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    info!(addr = %addr, "Starting Stalewatch");

    tokio::select! {
        result = HttpServer::new(services, metrics).serve(&addr) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_check_backups(
    config: &Config,
    request: &Path,
    mode: BackupMode,
) -> anyhow::Result<ExitCode> {
    let services = Services::from_config(config)?;
    let body = tokio::fs::read(request).await?;

    let response = checks::backup_entry(&services, &body, mode).await;
    print_response(&response)
}

async fn run_check_keys(config: &Config, request: &Path) -> anyhow::Result<ExitCode> {
    let services = Services::from_config(config)?;
    let body = tokio::fs::read(request).await?;

    let response = checks::key_entry(&services, &body).await;
    print_response(&response)
}

fn print_response(response: &EntryResponse) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

mod config;
mod logging;
mod server;
mod signals;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use users::UsersModule;

use crate::config::{AppConfig, CliOverrides};

/// Users Server - user records over gRPC with live change notifications
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - user records over gRPC with live change notifications")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for the gRPC server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database and message bus
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (USERS__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(CliOverrides {
        port: cli.port,
        verbose: cli.verbose,
        mock: cli.mock,
    });

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init_logging(&config.logging).context("failed to initialize logging")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!(mock = config.is_mock(), "Users Server starting");

    let module = UsersModule::init(&config.users()).await?;
    let root = CancellationToken::new();

    let on_signal = root.clone();
    tokio::spawn(async move {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::error!(error = %e, "signal handling failed, shutting down");
        }
        on_signal.cancel();
    });

    let served = server::serve(config.server.listen_addr, &module, root.clone()).await;
    root.cancel();

    shutdown_module(&module, config.server.shutdown_grace).await;
    served
}

/// Tear down in reverse creation order. Overrunning the grace period is
/// logged, not fatal.
async fn shutdown_module(module: &UsersModule, grace: Duration) {
    match tokio::time::timeout(grace, module.shutdown()).await {
        Ok(Ok(())) => tracing::info!("shutdown complete"),
        Ok(Err(e)) => tracing::warn!(error = %e, "shutdown finished with errors"),
        Err(_) => tracing::warn!(grace = ?grace, "shutdown grace period elapsed"),
    }
}
